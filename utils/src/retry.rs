//! Timeouts and retries around RPC suspension points.

use crate::types::AvsError;
use std::future::Future;
use std::time::Duration;

const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 500;
const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Applied to every single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, timeout: Duration) -> Self {
        Self {
            max_retries,
            timeout,
            ..Self::default()
        }
    }

    /// Exponential backoff, capped at `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }
}

/// Runs `fut`, failing with [`AvsError::Timeout`] if it does not finish within `timeout`.
pub async fn with_timeout<F: Future>(
    timeout: Duration,
    what: &'static str,
    fut: F,
) -> Result<F::Output, AvsError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| AvsError::Timeout(timeout, what))
}

/// Retries `op` while it fails with a transient error. Only use this for
/// idempotent calls; transaction submissions must not go through here.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    what: &'static str,
    mut op: F,
) -> Result<T, AvsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AvsError>>,
{
    let mut attempt = 0;
    loop {
        let result = with_timeout(policy.timeout, what, op()).await.and_then(|r| r);
        match result {
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.backoff_delay(attempt);
                log::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what,
                    attempt + 1,
                    policy.max_retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}
