//! Declarative route table for the memo API.
//!
//! Each entry binds a method and path to a [`DispatchPolicy`]; a single
//! generic handler serves all of them through the [`Dispatcher`].
//!
//! [`Dispatcher`]: crate::application::dispatch::Dispatcher

use std::collections::HashMap;

use axum::{
    Router,
    extract::{Path, State, rejection::PathRejection},
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{MethodFilter, on},
};
use bytes::Bytes;

use crate::application::dispatch::{DispatchPolicy, Operation, OperationInput};
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

use super::{HttpState, error::ApiError};

const SOURCE: &str = "infra::http::routes";
const ID_PARAM: &str = "id";

#[derive(Debug, Clone, Copy)]
pub struct RouteSpec {
    pub method: MethodFilter,
    pub path: &'static str,
    pub policy: DispatchPolicy,
    pub success_status: StatusCode,
}

pub const ROUTES: [RouteSpec; 3] = [
    RouteSpec {
        method: MethodFilter::GET,
        path: "/list",
        policy: DispatchPolicy::cached_read(Operation::ListMemos),
        success_status: StatusCode::OK,
    },
    RouteSpec {
        method: MethodFilter::POST,
        path: "/",
        policy: DispatchPolicy::invalidating_write(Operation::CreateMemo),
        success_status: StatusCode::CREATED,
    },
    RouteSpec {
        method: MethodFilter::DELETE,
        path: "/{id}",
        policy: DispatchPolicy::invalidating_write(Operation::DeleteMemo),
        success_status: StatusCode::OK,
    },
];

/// Register every entry of [`ROUTES`] on the router.
pub fn mount(router: Router<HttpState>) -> Router<HttpState> {
    ROUTES.iter().copied().fold(router, |router, route| {
        router.route(
            route.path,
            on(
                route.method,
                move |State(state): State<HttpState>,
                      params: Result<Path<HashMap<String, String>>, PathRejection>,
                      body: Bytes| async move {
                    match path_id(params) {
                        Ok(id) => serve(&state, &route, OperationInput { id, body }).await,
                        Err(err) => ApiError::new(SOURCE, err).into_response(),
                    }
                },
            ),
        )
    })
}

/// Pull the memo id out of the path; routes without parameters yield `None`.
fn path_id(
    params: Result<Path<HashMap<String, String>>, PathRejection>,
) -> Result<Option<String>, RepoError> {
    match params {
        Ok(Path(mut params)) => Ok(params.remove(ID_PARAM)),
        Err(PathRejection::MissingPathParams(_)) => Ok(None),
        Err(rejection) => Err(DomainError::validation(rejection.body_text()).into()),
    }
}

async fn serve(state: &HttpState, route: &RouteSpec, input: OperationInput) -> Response {
    match state.dispatcher.dispatch(&route.policy, input).await {
        Ok(payload) => (
            route.success_status,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            payload,
        )
            .into_response(),
        Err(err) => ApiError::new(SOURCE, err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_writes_invalidate() {
        for route in ROUTES {
            let is_write = route.policy.operation != Operation::ListMemos;
            assert_eq!(route.policy.invalidates_on_success, is_write, "{}", route.path);
        }
    }

    #[test]
    fn list_route_reads_through_cache() {
        let list = ROUTES
            .iter()
            .find(|route| route.path == "/list")
            .expect("list route");
        assert!(list.policy.uses_cached_read);
        assert_eq!(list.success_status, StatusCode::OK);
    }
}
