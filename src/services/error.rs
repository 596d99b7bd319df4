//! Storage error taxonomy shared by every component behind the gateway.

use std::fmt;
use thiserror::Error;

/// Coarse, client-visible classification of a [`StorageError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    PermissionDenied,
    PayloadTooLarge,
    TransientError,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::PayloadTooLarge => "PayloadTooLarge",
            ErrorKind::TransientError => "TransientError",
            ErrorKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures produced at the backend-call boundary.
///
/// `detail` fields hold raw backend text for server-side logs only; they
/// must never be echoed to clients.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("object `{key}` not found")]
    NotFound { key: String },

    #[error("permission denied during {operation}: {detail}")]
    PermissionDenied {
        operation: &'static str,
        detail: String,
    },

    #[error("payload of {size} bytes exceeds maximum {max} bytes")]
    PayloadTooLarge { size: u64, max: u64 },

    #[error("backend throttled {operation}: {detail}")]
    Throttled {
        operation: &'static str,
        detail: String,
    },

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("transient failure during {operation}: {detail}")]
    Transient {
        operation: &'static str,
        detail: String,
    },

    #[error("unexpected failure during {operation}: {detail}")]
    Unknown {
        operation: &'static str,
        detail: String,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn transient(operation: &'static str, detail: impl fmt::Display) -> Self {
        Self::Transient {
            operation,
            detail: detail.to_string(),
        }
    }

    pub fn unknown(operation: &'static str, detail: impl fmt::Display) -> Self {
        Self::Unknown {
            operation,
            detail: detail.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::Throttled { .. } | Self::Timeout { .. } | Self::Transient { .. } => {
                ErrorKind::TransientError
            }
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Throttling, timeouts and network faults may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Throttled { .. } | Self::Timeout { .. } | Self::Transient { .. }
        )
    }
}
