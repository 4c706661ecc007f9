//! Exponential backoff for side-effect-free remote calls.

use crate::ConfigError;
use serde::Serialize;
use std::{fmt::Display, future::Future, time::Duration};
use thiserror::Error;
use tracing::warn;

/// Every attempt of a retried operation failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("exponential backoff failed after {attempts} attempts: {last_error}")]
pub struct RetryExhausted {
    /// Number of attempts made.
    pub attempts: u32,
    /// The error of the last attempt.
    pub last_error: String,
}

/// Parameters of [exponential_backoff].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BackoffPolicy {
    /// Wait after the first failure.
    pub initial_wait: Duration,
    /// Maximum number of attempts.
    pub retries: u32,
    /// Growth of the wait after every failure.
    pub factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { initial_wait: Duration::from_millis(500), retries: 5, factor: 2.0 }
    }
}

impl BackoffPolicy {
    /// Checks that at least one attempt is made.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        Ok(())
    }
}

/// Runs `operation` until it succeeds, waiting `initial_wait` after the first failure and
/// multiplying the wait by `factor` after each further one.
///
/// ## Takes
/// - `policy`: The [BackoffPolicy].
/// - `operation`: Produces a fresh attempt each time it is called.
///
/// ## Returns
/// - `Ok(T)`: The result of the first successful attempt.
/// - `Err(RetryExhausted)`: All `retries` attempts failed.
pub async fn exponential_backoff<T, E, F, Fut>(
    policy: BackoffPolicy,
    mut operation: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut wait = policy.initial_wait;
    let mut last_error = String::from("no attempt made");
    for attempt in 1..=policy.retries {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(target: "retry", "attempt {attempt}/{} failed: {e}", policy.retries);
                last_error = e.to_string();
            }
        }
        if attempt < policy.retries {
            tokio::time::sleep(wait).await;
            wait = wait.mul_f64(policy.factor);
        }
    }
    Err(RetryExhausted { attempts: policy.retries, last_error })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const fn fast_policy(retries: u32) -> BackoffPolicy {
        BackoffPolicy { initial_wait: Duration::from_millis(1), retries, factor: 2.0 }
    }

    #[tokio::test]
    async fn test_backoff_first_success() {
        let calls = AtomicU32::new(0);
        let result = exponential_backoff(fast_policy(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(7)
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backoff_recovers() {
        let calls = AtomicU32::new(0);
        let result = exponential_backoff(fast_policy(5), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(format!("timeout {n}"))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn test_backoff_exhausted() {
        let calls = AtomicU32::new(0);
        let result = exponential_backoff(fast_policy(4), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err::<(), _>(format!("timeout {n}"))
        })
        .await;
        assert_eq!(
            result,
            Err(RetryExhausted { attempts: 4, last_error: "timeout 4".to_string() })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_wait_grows() {
        let policy =
            BackoffPolicy { initial_wait: Duration::from_secs(1), retries: 3, factor: 3.0 };
        let start = tokio::time::Instant::now();
        let _ = exponential_backoff(policy, || async { Err::<(), _>("down") }).await;
        // Waits of 1s and 3s between the three attempts.
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[test]
    fn test_policy_rejects_zero_retries() {
        assert_eq!(fast_policy(0).validate(), Err(ConfigError::ZeroRetries));
        assert_eq!(fast_policy(1).validate(), Ok(()));
        assert_eq!(BackoffPolicy::default().validate(), Ok(()));
    }
}
