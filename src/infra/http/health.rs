use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::application::{error::ErrorReport, repos::Backend};

use super::HttpState;

#[derive(Debug, Serialize)]
pub struct SelectionView {
    pub cache_backed: bool,
    pub backend: Backend,
}

pub async fn db_health(State(state): State<HttpState>) -> Response {
    let ctx = state.dispatcher.context();
    match state.dispatcher.selection().handle().store_health(&ctx).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

pub async fn selection(State(state): State<HttpState>) -> Json<SelectionView> {
    let selection = state.dispatcher.selection();
    Json(SelectionView {
        cache_backed: selection.is_cache_backed(),
        backend: selection.backend(),
    })
}
