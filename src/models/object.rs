//! Represents an object (file) addressed by key in the backing bucket.

use crate::services::error::{StorageError, StorageResult};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;

/// Longest key S3 accepts, in bytes.
pub const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Opaque, validated identifier of an object within the bucket.
///
/// Keys are non-empty, at most [`MAX_OBJECT_KEY_LEN`] bytes, and contain no
/// control characters. Path-like keys (`photos/2025/img.jpg`) are allowed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Validate `raw` and wrap it as a key.
    pub fn parse(raw: impl Into<String>) -> StorageResult<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(StorageError::invalid_input("object key must not be empty"));
        }
        if raw.len() > MAX_OBJECT_KEY_LEN {
            return Err(StorageError::invalid_input(format!(
                "object key exceeds {} bytes",
                MAX_OBJECT_KEY_LEN
            )));
        }
        if raw.chars().any(char::is_control) {
            return Err(StorageError::invalid_input(
                "object key must not contain control characters",
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the key, used for content-type resolution.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Metadata the backend reports for a stored object. Read-only here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub key: ObjectKey,

    /// Size in bytes.
    pub size: u64,

    /// Timestamp when the object was last written.
    pub last_modified: DateTime<Utc>,
}

/// The operation a signed URL authorizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignedOperation {
    Get,
    Put,
}

impl SignedOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignedOperation::Get => "get",
            SignedOperation::Put => "put",
        }
    }
}

impl fmt::Display for SignedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time-limited URL granting access to one object. Never cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Bytes to store under a key, with the content type attached as metadata.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub key: ObjectKey,
    pub content: Bytes,
    pub content_type: String,
}

impl UploadRequest {
    /// Build an upload, resolving the content type from the key's file name
    /// when the caller supplies none.
    pub fn new(key: ObjectKey, content: Bytes, content_type: Option<String>) -> Self {
        let content_type = content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| {
                crate::services::content_type::resolve(key.file_name()).to_string()
            });
        Self {
            key,
            content,
            content_type,
        }
    }
}
