//! API error handling
//!
//! Maps application errors onto HTTP status codes with a uniform JSON
//! envelope. Internal details are logged, not returned.

use application::ApplicationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// API-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request conflicts with the resource's current state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        match err {
            ApplicationError::NotFound(msg) => Self::NotFound(msg),
            ApplicationError::Domain(DomainError::InvalidTransition { from, to }) => {
                Self::Conflict(format!("cannot move test from {from} to {to}"))
            },
            ApplicationError::Domain(domain_err) => Self::BadRequest(domain_err.to_string()),
            ApplicationError::Configuration(msg) => Self::Internal(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Uniform error envelope
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(msg) => {
                // Internal details go to the log, not the wire
                error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            },
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}
