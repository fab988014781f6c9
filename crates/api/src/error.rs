//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use loms::{ErrorKind, LomsError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Orchestrator error.
    Loms(LomsError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Loms(err) => match err.kind() {
                ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::InsufficientStock | ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::CompensationFailure => StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::StorageFault => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Loms(err) => {
                if status.is_server_error() {
                    tracing::error!(error = %err, kind = ?err.kind(), "request failed");
                }
                err.to_string()
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<LomsError> for ApiError {
    fn from(err: LomsError) -> Self {
        ApiError::Loms(err)
    }
}
