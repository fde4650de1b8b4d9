mod error;
mod health;
mod middleware;
mod routes;

pub use error::{ApiError, ApiErrorBody, ApiErrorMessage, status_for};
pub use health::SelectionView;
pub use routes::{ROUTES, RouteSpec};

use std::sync::Arc;

use axum::{
    Router,
    http::Uri,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::{
    dispatch::Dispatcher,
    repos::{ErrorKind, RepoError},
};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub dispatcher: Arc<Dispatcher>,
}

impl HttpState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    routes::mount(Router::new())
        .route("/_health/db", get(health::db_health))
        .route("/_health/selection", get(health::selection))
        .fallback(fallback)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn fallback(uri: Uri) -> Response {
    let err = RepoError::new(
        ErrorKind::NotFound,
        "http",
        format!("no route for `{}`", uri.path()),
    );
    ApiError::new("infra::http::fallback", err).into_response()
}
