//! # HTTP Error Mapping
//!
//! Converts the library's error taxonomy into HTTP status codes and
//! JSON error bodies. Nothing is allowed to crash the process: every
//! storage failure is caught at this boundary and reported per-request.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use lib_registry::{ServiceError, StorageError};

/// Request-scoped error, rendered as `{"error": <message>}`.
#[derive(Debug)]
pub enum ApiError {
    /// Missing/blank field or invalid enum value.
    BadRequest(String),
    /// Retracting or deleting something that does not exist.
    NotFound(String),
    /// Missing or wrong admin key on a privileged endpoint.
    Forbidden(String),
    /// Storage not configured or unreachable.
    Unavailable(String),
    /// Unexpected storage failure; the detail goes to the log, the
    /// generic message to the client.
    Internal(String),
}

impl ApiError {
    /// Maps a service failure for read/delete endpoints, which report
    /// the terse unavailability message.
    pub fn from_service(err: ServiceError, internal_msg: &str) -> Self {
        Self::map(err, internal_msg, "Database not available")
    }

    /// Maps a service failure for submission endpoints, which point the
    /// operator at the missing database setup.
    pub fn from_service_setup(err: ServiceError, internal_msg: &str) -> Self {
        Self::map(
            err,
            internal_msg,
            "Database not available. Please set up Postgres database.",
        )
    }

    fn map(err: ServiceError, internal_msg: &str, unavailable_msg: &str) -> Self {
        match err {
            ServiceError::InvalidInput(msg) => ApiError::BadRequest(msg),
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::Storage(StorageError::Unavailable) => {
                ApiError::Unavailable(unavailable_msg.to_string())
            }
            ServiceError::Storage(e) => {
                error!("{}: {}", internal_msg, e);
                ApiError::Internal(internal_msg.to_string())
            }
        }
    }

    pub fn admin_required() -> Self {
        ApiError::Forbidden("Unauthorized: Admin access required".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
