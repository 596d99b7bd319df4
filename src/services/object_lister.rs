//! ObjectLister: paginated prefix listings with a signed URL per entry.

use crate::{
    models::{ListingEntry, ListingPage, ObjectMetadata, SignedOperation},
    services::{
        backend::ObjectBackend,
        call_policy::CallPolicy,
        continuation,
        error::{StorageError, StorageResult},
        url_signer::SignedUrlIssuer,
    },
};
use futures::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_MAX_KEYS: usize = 100;

/// S3 never returns more than this many keys per call.
pub const MAX_KEYS_LIMIT: usize = 1000;

#[derive(Clone)]
pub struct ObjectLister {
    backend: Arc<dyn ObjectBackend>,
    issuer: SignedUrlIssuer,
    policy: CallPolicy,
    default_max_keys: usize,
    signing_concurrency: usize,
}

impl ObjectLister {
    pub fn new(
        backend: Arc<dyn ObjectBackend>,
        issuer: SignedUrlIssuer,
        policy: CallPolicy,
        default_max_keys: usize,
        signing_concurrency: usize,
    ) -> Self {
        Self {
            backend,
            issuer,
            policy,
            default_max_keys: default_max_keys.clamp(1, MAX_KEYS_LIMIT),
            signing_concurrency: signing_concurrency.max(1),
        }
    }

    /// Page size to request: the caller's value clamped to
    /// [`MAX_KEYS_LIMIT`], or the default. Zero is rejected.
    pub fn effective_max_keys(&self, max_keys: Option<usize>) -> StorageResult<usize> {
        match max_keys {
            None => Ok(self.default_max_keys),
            Some(0) => Err(StorageError::invalid_input("maxKeys must be at least 1")),
            Some(n) => Ok(n.min(MAX_KEYS_LIMIT)),
        }
    }

    /// List one page of objects under `prefix` (empty matches everything).
    ///
    /// Entries keep the backend's order. If signing fails for any entry the
    /// whole page fails with a transient error; partial pages are never
    /// returned.
    pub async fn list(
        &self,
        prefix: &str,
        max_keys: Option<usize>,
        continuation_token: Option<&str>,
        ttl_secs: Option<i64>,
    ) -> StorageResult<ListingPage> {
        let max_keys = self.effective_max_keys(max_keys)?;
        self.issuer.resolve_ttl(ttl_secs)?;
        let backend_token = continuation_token
            .map(|token| continuation::decode(prefix, token))
            .transpose()?;

        let page = self
            .policy
            .run("list", prefix, || {
                self.backend
                    .list_page(prefix, max_keys, backend_token.as_deref())
            })
            .await?;

        if page.objects.len() > max_keys {
            return Err(StorageError::unknown(
                "list",
                format!(
                    "backend returned {} entries for a page of {}",
                    page.objects.len(),
                    max_keys
                ),
            ));
        }

        debug!(
            prefix,
            entries = page.objects.len(),
            truncated = page.next_token.is_some(),
            "listed backend page"
        );

        let entries = self.sign_entries(page.objects, ttl_secs).await?;
        let next_continuation_token = page
            .next_token
            .as_deref()
            .map(|token| continuation::encode(prefix, token))
            .transpose()?;

        Ok(ListingPage {
            prefix: prefix.to_string(),
            entries,
            truncated: next_continuation_token.is_some(),
            next_continuation_token,
        })
    }

    /// Sign every entry with bounded concurrency, reassembling results in
    /// listing order rather than completion order.
    async fn sign_entries(
        &self,
        objects: Vec<ObjectMetadata>,
        ttl_secs: Option<i64>,
    ) -> StorageResult<Vec<ListingEntry>> {
        stream::iter(objects)
            .map(|metadata| async move {
                match self
                    .issuer
                    .issue(&metadata.key, SignedOperation::Get, ttl_secs)
                    .await
                {
                    Ok(signed_url) => Ok(ListingEntry {
                        metadata,
                        signed_url,
                    }),
                    Err(err) => {
                        warn!(key = %metadata.key, error = %err, "signing listing entry failed");
                        Err(StorageError::transient("sign listing entry", err))
                    }
                }
            })
            .buffered(self.signing_concurrency)
            .try_collect()
            .await
    }
}
