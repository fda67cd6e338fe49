//! API error handling
//!
//! Domain errors keep their category on the wire: validation failures become
//! 422, refused transitions 409, stale writes 409 with `retryable` set, and
//! record store outages 503 with `retryable` set so clients can offer a
//! retry instead of a form error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_directory::DirectoryError;
use domain_reimbursement::{ErrorKind, ReimbursementError};
use domain_reporting::ReportError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not allowed from the record's current state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The record changed since the client read it
    #[error("Stale: {0}")]
    Stale(String),

    #[error("Validation error: {0}")]
    Validation(String, Option<Vec<String>>),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Whether repeating the request (after a refetch) may succeed
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into(), None)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) | ApiError::Stale(_) => StatusCode::CONFLICT,
            ApiError::Validation(..) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Stale(_) | ApiError::Unavailable(_))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retryable = self.is_retryable();
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Unauthorized => ("unauthorized", "Unauthorized".to_string(), None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::Conflict(msg) => ("invalid_transition", msg, None),
            ApiError::Stale(msg) => ("stale_state", msg, None),
            ApiError::Validation(msg, details) => ("validation_error", msg, details),
            ApiError::Unavailable(msg) => ("storage_unavailable", msg, None),
            ApiError::Internal(msg) => ("internal_error", msg, None),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            retryable,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ReimbursementError> for ApiError {
    fn from(err: ReimbursementError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => ApiError::validation(message),
            ErrorKind::Transition => ApiError::Conflict(message),
            ErrorKind::Concurrency => ApiError::Stale(message),
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::Authorization => ApiError::Forbidden(message),
            ErrorKind::Storage if err.is_retryable() => ApiError::Unavailable(message),
            ErrorKind::Storage => {
                error!(error = %message, "stored record could not be read");
                ApiError::Internal(message)
            }
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        ReimbursementError::from(err).into()
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Source(inner) => inner.into(),
            ReportError::Unauthorized(msg) => ApiError::Forbidden(msg),
            other => ApiError::validation(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let codes: Vec<_> = errs.iter().map(|e| e.code.to_string()).collect();
                format!("{field}: {}", codes.join(", "))
            })
            .collect();
        ApiError::Validation("request failed validation".to_string(), Some(details))
    }
}
