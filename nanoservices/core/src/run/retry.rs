use std::future::Future;
use std::time::Duration;

use starlift_utils::{StarliftResult, TaskError};
use tokio::sync::watch;

/// Per-task retry bound and fixed inter-retry delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Clamped to at least 1.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A single attempt and no waiting, useful for sentinels and tests.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Run an operation under a retry policy, returning the attempt count along
/// with the final result.
///
/// Only retryable errors trigger another attempt; a running attempt is never
/// interrupted, but cancellation cuts the inter-retry wait short.
pub async fn execute_with_retry<F, Fut>(
    policy: RetryPolicy,
    cancel: watch::Receiver<bool>,
    task: &str,
    mut operation: F,
) -> (u32, StarliftResult<()>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StarliftResult<()>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(()) => return (attempt, Ok(())),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    task,
                    attempt,
                    max_attempts,
                    error = %e,
                    "attempt failed, retrying after delay"
                );
                tokio::select! {
                    _ = tokio::time::sleep(policy.delay) => {}
                    _ = cancelled(cancel.clone()) => {
                        return (attempt, Err(TaskError::Cancelled));
                    }
                }
            }
            Err(e) => return (attempt, Err(e)),
        }
    }
}

/// Resolves once cancellation is requested; never resolves if the cancel
/// channel's sender side is gone.
async fn cancelled(mut cancel: watch::Receiver<bool>) {
    if cancel.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}
