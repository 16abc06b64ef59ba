//! HTTP error type and mappings from runtime errors to status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use d3k_runtime::{QueryError, RotationError, RotationStep, SessionLookupError};
use serde::Serialize;
use thiserror::Error;

/// Message for every query against a file that does not exist.
pub const LOG_NOT_FOUND: &str = "log file not found";

#[derive(Debug, Error)]
pub enum HttpError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The endpoint needs a component this server was started without.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %message, "Request failed");
        }

        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<QueryError> for HttpError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::NotFound(_) => Self::NotFound(LOG_NOT_FOUND.to_string()),
            QueryError::Io { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<RotationError> for HttpError {
    fn from(err: RotationError) -> Self {
        if err.is_not_found() {
            Self::NotFound("current log not found".to_string())
        } else if err.step == RotationStep::Verify && err.source.kind() == std::io::ErrorKind::InvalidInput {
            Self::BadRequest(err.source.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<SessionLookupError> for HttpError {
    fn from(err: SessionLookupError) -> Self {
        Self::NotFound(err.to_string())
    }
}
