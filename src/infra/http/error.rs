use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::ErrorReport;
use crate::application::repos::{ErrorKind, RepoError};

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub kind: &'static str,
    pub source: &'static str,
    pub message: String,
}

/// HTTP status for each failure kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::ValidationFailure => StatusCode::BAD_REQUEST,
        ErrorKind::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::ConnectionFailure => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ReadFailure | ErrorKind::WriteFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn public_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "Memo not found",
        ErrorKind::ValidationFailure => "Invalid request",
        ErrorKind::Cancelled => "Backend did not respond in time",
        ErrorKind::ConnectionFailure => "Backend unavailable",
        ErrorKind::ReadFailure => "Failed to read memos",
        ErrorKind::WriteFailure => "Failed to write memo",
    }
}

/// Error response for the memo routes.
///
/// Validation messages are returned to the client; every other detail stays
/// in the attached [`ErrorReport`].
#[derive(Debug)]
pub struct ApiError {
    origin: &'static str,
    status: StatusCode,
    error: RepoError,
}

impl ApiError {
    pub fn new(origin: &'static str, error: RepoError) -> Self {
        Self {
            origin,
            status: status_for(error.kind()),
            error,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.error.kind();
        let message = match kind {
            ErrorKind::ValidationFailure => self.error.message().to_string(),
            other => public_message(other).to_string(),
        };
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                kind: kind.as_str(),
                source: self.error.component(),
                message,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_error(self.origin, self.status, &self.error).attach(&mut response);
        response
    }
}
