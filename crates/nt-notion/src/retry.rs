use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{NotionError, Result};

/// Bounds for retrying a remote operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each one after.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `attempt` (1-based): `base * 2^(attempt - 2)`.
    fn delay_before(&self, attempt: u32) -> Duration {
        debug_assert!(attempt >= 2);
        self.base_delay * 2u32.saturating_pow(attempt - 2)
    }
}

/// Wraps remote operations with bounded exponential-backoff retry.
///
/// Only [`NotionError::is_transient`] failures are retried; anything else
/// fails fast, since resending a malformed payload cannot succeed and only
/// burns rate-limit budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Execute `op`, retrying transient failures up to the policy's bound.
    ///
    /// Returns [`NotionError::RetryExhausted`] wrapping the final transient
    /// error when every attempt failed.
    pub async fn run<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max = self.policy.max_attempts.max(1);
        let mut last_err: Option<NotionError> = None;

        for attempt in 1..=max {
            if attempt > 1 {
                tokio::time::sleep(self.policy.delay_before(attempt)).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    warn!(attempt, max_attempts = max, error = %e, "transient remote failure");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(NotionError::RetryExhausted {
            attempts: max,
            source: Box::new(last_err.unwrap_or(NotionError::Transient("no attempts ran".into()))),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_executor(max_attempts: u32) -> RetryExecutor {
        RetryExecutor::new(RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
        })
    }

    #[tokio::test]
    async fn succeeds_first_try_without_delay() {
        let executor = fast_executor(3);
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();

        let result = executor
            .run(|| {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42u32)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let executor = fast_executor(3);
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();

        let result = executor
            .run(|| {
                let calls = calls2.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(NotionError::RateLimited)
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let executor = fast_executor(3);
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();

        let result: Result<()> = executor
            .run(|| {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(NotionError::Transient("502".into()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(NotionError::RetryExhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, NotionError::Transient(_)));
            }
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn permanent_errors_fail_fast() {
        let executor = fast_executor(5);
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();

        let result: Result<()> = executor
            .run(|| {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(NotionError::InvalidRequest("bad filter".into()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(NotionError::InvalidRequest(_))));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_before(2), Duration::from_millis(100));
        assert_eq!(policy.delay_before(3), Duration::from_millis(200));
        assert_eq!(policy.delay_before(4), Duration::from_millis(400));
    }
}
