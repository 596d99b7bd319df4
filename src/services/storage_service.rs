//! StorageService: the bundle of object-store components handed to the
//! router as shared state. It owns no mutable state: every component holds
//! the same injected backend and a copy of the call policy, so requests can
//! run concurrently without locks.

use crate::services::{
    backend::ObjectBackend,
    call_policy::{CallPolicy, RetryPolicy},
    object_accessor::ObjectAccessor,
    object_lister::{DEFAULT_MAX_KEYS, ObjectLister},
    url_signer::{DEFAULT_TTL_SECS, SignedUrlIssuer},
};
use std::{sync::Arc, time::Duration};

/// Tunables for the storage components, usually derived from `AppConfig`.
#[derive(Clone, Debug)]
pub struct ServiceSettings {
    pub signed_url_ttl: Duration,
    pub clock_skew: Duration,
    pub default_max_keys: usize,
    pub signing_concurrency: usize,
    pub max_upload_bytes: u64,
    pub backend_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            signed_url_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            clock_skew: Duration::from_secs(30),
            default_max_keys: DEFAULT_MAX_KEYS,
            signing_concurrency: 16,
            max_upload_bytes: 50 * 1024 * 1024,
            backend_timeout: Duration::from_secs(10),
            retry: RetryPolicy::disabled(),
        }
    }
}

#[derive(Clone)]
pub struct StorageService {
    pub backend: Arc<dyn ObjectBackend>,
    pub lister: ObjectLister,
    pub accessor: ObjectAccessor,
    pub policy: CallPolicy,
}

impl StorageService {
    /// Wire every component to the same backend.
    pub fn new(backend: Arc<dyn ObjectBackend>, settings: ServiceSettings) -> Self {
        let policy = CallPolicy::new(settings.backend_timeout, settings.retry.clone());
        let issuer = SignedUrlIssuer::new(
            backend.clone(),
            policy.clone(),
            settings.signed_url_ttl,
            settings.clock_skew,
        );
        let lister = ObjectLister::new(
            backend.clone(),
            issuer.clone(),
            policy.clone(),
            settings.default_max_keys,
            settings.signing_concurrency,
        );
        let accessor = ObjectAccessor::new(
            backend.clone(),
            issuer,
            policy.clone(),
            settings.max_upload_bytes,
        );
        Self {
            backend,
            lister,
            accessor,
            policy,
        }
    }

    /// Probe the backend under the per-call timeout, without retries.
    pub async fn health_check(&self) -> crate::services::error::StorageResult<()> {
        let probe = CallPolicy::new(self.policy.timeout, RetryPolicy::disabled());
        probe
            .run("health check", self.backend.backend_name(), || {
                self.backend.health_check()
            })
            .await
    }
}
