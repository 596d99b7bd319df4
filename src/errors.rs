use crate::services::error::{ErrorKind, StorageError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

/// Gateway error: an HTTP status, a machine-readable kind and a stable,
/// client-safe message. Backend detail stays in server logs.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status, kind and message.
    pub fn new(status: StatusCode, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: msg.into(),
        }
    }

    /// Shortcut for 400 Bad Request
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorKind::InvalidInput, msg)
    }

    /// Translate a storage failure for `operation` on `subject`, logging the
    /// full error server-side. `failure` is the client-facing summary,
    /// e.g. "failed to delete file".
    pub fn from_storage(
        operation: &'static str,
        subject: &str,
        failure: &str,
        err: StorageError,
    ) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            error!(operation, subject, kind = %err.kind(), error = %err, "storage operation failed");
        } else {
            warn!(operation, subject, kind = %err.kind(), error = %err, "storage operation rejected");
        }

        let message = match &err {
            StorageError::InvalidInput(reason) => format!("{failure}: {reason}"),
            StorageError::NotFound { .. } => format!("{failure}: object not found"),
            StorageError::PermissionDenied { .. } => format!("{failure}: permission denied"),
            StorageError::PayloadTooLarge { max, .. } if *max > 0 => {
                format!("{failure}: file exceeds the {max} byte limit")
            }
            StorageError::PayloadTooLarge { .. } => format!("{failure}: file is too large"),
            StorageError::Timeout { .. } => format!("{failure}: storage backend timed out"),
            StorageError::Throttled { .. } | StorageError::Transient { .. } => {
                format!("{failure}: storage backend temporarily unavailable")
            }
            StorageError::Unknown { .. } => failure.to_string(),
        };

        Self::new(status, err.kind(), message)
    }
}

/// HTTP status for each failure; timeouts get 504, other transient faults 502.
pub fn status_for(err: &StorageError) -> StatusCode {
    match err {
        StorageError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
        StorageError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        StorageError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        StorageError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        StorageError::Throttled { .. } | StorageError::Transient { .. } => StatusCode::BAD_GATEWAY,
        StorageError::Unknown { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.message,
            "errorKind": self.kind.as_str(),
        }));

        (self.status, body).into_response()
    }
}
