//! The object-store seam. Components receive an `Arc<dyn ObjectBackend>`
//! so tests can swap the S3 client for an in-memory fake.

use crate::{
    models::{ObjectKey, ObjectMetadata, SignedOperation},
    services::error::StorageResult,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::{Duration, SystemTime};

/// One raw page from the backend's list call.
#[derive(Clone, Debug, Default)]
pub struct BackendPage {
    /// Objects in the order the backend reported them.
    pub objects: Vec<ObjectMetadata>,

    /// Backend-native continuation token; `Some` iff the listing was truncated.
    pub next_token: Option<String>,
}

/// Remote object store reachable via list/put/delete and URL presigning.
#[async_trait]
pub trait ObjectBackend: Send + Sync + 'static {
    /// List at most `max_keys` objects under `prefix`, resuming after `token`.
    async fn list_page(
        &self,
        prefix: &str,
        max_keys: usize,
        token: Option<&str>,
    ) -> StorageResult<BackendPage>;

    /// Store `body` under `key`, replacing any existing object.
    async fn put_object(&self, key: &ObjectKey, body: Bytes, content_type: &str)
    -> StorageResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete_object(&self, key: &ObjectKey) -> StorageResult<()>;

    /// Produce a URL authorizing `operation` on `key`, valid from `start`
    /// for `expires_in`. Does not check that the key exists.
    async fn presign(
        &self,
        key: &ObjectKey,
        operation: SignedOperation,
        start: SystemTime,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Lightweight connectivity probe used by `/readyz`.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Static identifier for logs, e.g. "s3".
    fn backend_name(&self) -> &'static str;
}
