//! Retry policy for remote catalog calls.
//!
//! Fixed short pause between attempts with a low attempt ceiling. Every remote
//! call in the crate goes through [`fetch_with_retry`] or, for other error
//! types, [`retry_with_policy`] with its own failure classifier.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::error::CollectionError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(350);

/// Retry policy with a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause between two consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Attempts actually performed.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Check if another attempt should follow a failure of attempt number `attempt` (1-based).
    pub fn should_retry(&self, retryable: bool, attempt: u32) -> bool {
        retryable && attempt < self.attempts()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempts run out. Returns the success or the last error seen.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_with_policy<F, Fut, T, E, C>(
    policy: &RetryPolicy,
    label: &str,
    is_retryable: C,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !policy.should_retry(is_retryable(&e), attempt) {
                    if attempt > 1 {
                        warn!("{} failed after {} attempts: {}", label, attempt, e);
                    }
                    return Err(e);
                }
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    label, attempt, attempts, e
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

/// [`retry_with_policy`] classified by [`CollectionError::is_retryable`].
pub async fn fetch_with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    label: &str,
    op: F,
) -> Result<T, CollectionError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, CollectionError>>,
{
    retry_with_policy(policy, label, CollectionError::is_retryable, op).await
}
