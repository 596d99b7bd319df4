//! ObjectAccessor: single-object fetch, store and delete.

use crate::{
    models::{ObjectKey, SignedOperation, SignedUrl, UploadRequest},
    services::{
        backend::ObjectBackend,
        call_policy::CallPolicy,
        error::{StorageError, StorageResult},
        url_signer::SignedUrlIssuer,
    },
};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct ObjectAccessor {
    backend: Arc<dyn ObjectBackend>,
    issuer: SignedUrlIssuer,
    policy: CallPolicy,
    max_upload_bytes: u64,
}

impl ObjectAccessor {
    pub fn new(
        backend: Arc<dyn ObjectBackend>,
        issuer: SignedUrlIssuer,
        policy: CallPolicy,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            backend,
            issuer,
            policy,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Issue a download URL for `key`.
    ///
    /// Signing succeeds for keys that do not exist; a missing object only
    /// shows up when the client dereferences the URL.
    pub async fn get(&self, key: &ObjectKey, ttl_secs: Option<i64>) -> StorageResult<SignedUrl> {
        self.issuer.issue(key, SignedOperation::Get, ttl_secs).await
    }

    /// Store the upload, overwriting any object at the same key
    /// (last write wins).
    pub async fn put(&self, request: UploadRequest) -> StorageResult<ObjectKey> {
        let size = request.content.len() as u64;
        if size > self.max_upload_bytes {
            return Err(StorageError::PayloadTooLarge {
                size,
                max: self.max_upload_bytes,
            });
        }

        self.policy
            .run("put", request.key.as_str(), || {
                self.backend.put_object(
                    &request.key,
                    request.content.clone(),
                    &request.content_type,
                )
            })
            .await?;

        info!(
            key = %request.key,
            size,
            content_type = %request.content_type,
            "stored object"
        );
        Ok(request.key)
    }

    /// Delete `key`. Idempotent: a missing key counts as deleted.
    pub async fn delete(&self, key: &ObjectKey) -> StorageResult<()> {
        match self
            .policy
            .run("delete", key.as_str(), || self.backend.delete_object(key))
            .await
        {
            Ok(()) => {
                info!(key = %key, "deleted object");
                Ok(())
            }
            Err(StorageError::NotFound { .. }) => {
                debug!(key = %key, "delete of missing object treated as success");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
