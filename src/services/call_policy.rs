//! Per-call timeout and optional retry with exponential backoff.
//!
//! Every backend call goes through [`CallPolicy::run`]. A call that outlives
//! the timeout is dropped and reported as `StorageError::Timeout`. Retries are
//! off unless `max_attempts > 1`, and only retryable failures (throttling,
//! timeouts, network faults) are attempted again.

use crate::services::error::{StorageError, StorageResult};
use std::{future::Future, time::Duration};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; 1 disables retry.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }

    /// Delay before the attempt following `attempt` (1-based):
    /// `min(base * 2^(attempt-1), max)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

#[derive(Clone, Debug)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl CallPolicy {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }

    /// Run `call` under the timeout, retrying retryable failures.
    ///
    /// `subject` is the key or prefix the call concerns; it only feeds logs.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        subject: &str,
        mut call: F,
    ) -> StorageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = match timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(StorageError::Timeout { operation }),
            };

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, subject, attempt, "backend call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        operation,
                        subject,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "backend call failed, will retry"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
