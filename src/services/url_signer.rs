//! SignedUrlIssuer: presigned URLs with explicit expiry.

use crate::{
    models::{ObjectKey, SignedOperation, SignedUrl},
    services::{
        backend::ObjectBackend,
        call_policy::CallPolicy,
        error::{StorageError, StorageResult},
    },
};
use chrono::Utc;
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

/// TTL applied when the caller does not ask for one.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// SigV4 presigned URLs cannot outlive seven days.
pub const MAX_PRESIGN_SECS: u64 = 7 * 24 * 60 * 60;

/// Issues signed URLs against the backend's credentials.
///
/// The signature start is backdated by `clock_skew` and the lifetime
/// stretched by the same amount, so a client whose clock runs slightly
/// behind still sees a valid URL, while the reported `expires_at` stays at
/// `now + ttl`.
#[derive(Clone)]
pub struct SignedUrlIssuer {
    backend: Arc<dyn ObjectBackend>,
    policy: CallPolicy,
    default_ttl: Duration,
    clock_skew: Duration,
}

impl SignedUrlIssuer {
    pub fn new(
        backend: Arc<dyn ObjectBackend>,
        policy: CallPolicy,
        default_ttl: Duration,
        clock_skew: Duration,
    ) -> Self {
        Self {
            backend,
            policy,
            default_ttl,
            clock_skew,
        }
    }

    /// Validate a caller TTL in seconds, falling back to the default.
    ///
    /// Zero and negative TTLs are rejected, as is any TTL that together with
    /// the skew allowance exceeds [`MAX_PRESIGN_SECS`].
    pub fn resolve_ttl(&self, ttl_secs: Option<i64>) -> StorageResult<Duration> {
        let ttl = match ttl_secs {
            None => self.default_ttl,
            Some(secs) if secs <= 0 => {
                return Err(StorageError::invalid_input(format!(
                    "ttl must be a positive number of seconds, got {}",
                    secs
                )));
            }
            Some(secs) => Duration::from_secs(secs as u64),
        };
        if ttl.is_zero() {
            return Err(StorageError::invalid_input("ttl must be positive"));
        }
        if ttl.as_secs().saturating_add(self.clock_skew.as_secs()) > MAX_PRESIGN_SECS {
            return Err(StorageError::invalid_input(format!(
                "ttl of {}s exceeds the maximum of {}s",
                ttl.as_secs(),
                MAX_PRESIGN_SECS.saturating_sub(self.clock_skew.as_secs())
            )));
        }
        Ok(ttl)
    }

    /// Sign `operation` on `key`. The key's existence is not checked.
    pub async fn issue(
        &self,
        key: &ObjectKey,
        operation: SignedOperation,
        ttl_secs: Option<i64>,
    ) -> StorageResult<SignedUrl> {
        let ttl = self.resolve_ttl(ttl_secs)?;
        let now = Utc::now();
        let now_system = SystemTime::from(now);
        let start = now_system
            .checked_sub(self.clock_skew)
            .unwrap_or(now_system);
        let expires_in = ttl + self.clock_skew;

        let url = self
            .policy
            .run("sign", key.as_str(), || {
                self.backend.presign(key, operation, start, expires_in)
            })
            .await?;

        Ok(SignedUrl {
            url,
            expires_at: now + chrono::Duration::seconds(ttl.as_secs() as i64),
        })
    }
}
