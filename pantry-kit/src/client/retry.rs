//! Retry with backoff for remote API calls

use crate::error::{PantryError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay every time
    Fixed,
    /// `initial_delay * n` before the n-th retry
    Linear,
    /// `initial_delay * 2^(n-1)` before the n-th retry
    Exponential,
}

/// Retry behavior for transient failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            backoff: Backoff::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        let delay = match self.backoff {
            Backoff::Fixed => self.initial_delay,
            Backoff::Linear => self.initial_delay.saturating_mul(retry),
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(retry - 1);
                self.initial_delay.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay)
    }

    /// Delay for `retry`, stretched to honor a server-provided wait
    fn delay_after(&self, retry: u32, err: &PantryError) -> Duration {
        let base = self.delay_for(retry);
        match err {
            PantryError::RateLimited {
                retry_after_secs: Some(secs),
            } => base.max(Duration::from_secs(*secs)),
            _ => base,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's retries are used up
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retry_count = 0;

    loop {
        match op().await {
            Ok(value) => {
                if retry_count > 0 {
                    debug!(operation, retry_count, "Succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && retry_count < policy.max_retries => {
                retry_count += 1;
                let delay = policy.delay_after(retry_count, &e);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying after {:?}",
                    operation,
                    retry_count,
                    policy.max_retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff: Backoff::Fixed,
        }
    }

    #[test]
    fn test_delays() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            backoff: Backoff::Exponential,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1000));

        let linear = RetryPolicy {
            backoff: Backoff::Linear,
            ..policy.clone()
        };
        assert_eq!(linear.delay_for(3), Duration::from_millis(300));

        let fixed = RetryPolicy {
            backoff: Backoff::Fixed,
            ..policy
        };
        assert_eq!(fixed.delay_for(3), Duration::from_millis(100));
    }

    #[test]
    fn test_retry_after_is_honored() {
        let policy = fast(3);
        let err = PantryError::RateLimited {
            retry_after_secs: Some(2),
        };
        assert_eq!(policy.delay_after(1, &err), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;

        let result = retry(&fast(3), "test", move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(PantryError::Network("reset".into()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;

        let result: Result<()> = retry(&fast(2), "test", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(PantryError::Timeout {
                timeout_seconds: 1,
                context: "test".into(),
            })
        })
        .await;

        assert!(matches!(result, Err(PantryError::Timeout { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;

        let result: Result<()> = retry(&fast(5), "test", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(PantryError::Authentication("bad key".into()))
        })
        .await;

        assert!(matches!(result, Err(PantryError::Authentication(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
