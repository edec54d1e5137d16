use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_retry2::strategy::FixedInterval;
use tokio_retry2::{Retry, RetryError};

/// Fixed-delay retry for outbound calls: downloads, S3 puts and image
/// generation. No backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// Runs `operation` until it succeeds or the attempts are used up. The
    /// last error is returned.
    pub async fn run<F, Fut, T, E>(&self, what: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let delay_ms = self.delay.as_millis() as u64;
        // The first attempt is not part of the strategy.
        let strategy = FixedInterval::from_millis(delay_ms).take(self.attempts.saturating_sub(1));

        Retry::spawn(strategy, || {
            let attempt = operation();
            async move {
                attempt.await.map_err(|err| {
                    tracing::warn!(operation = what, error = %err, "Attempt failed, will retry");
                    RetryError::Transient {
                        err,
                        retry_after: None,
                    }
                })
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick(attempts: usize) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1))
    }

    #[test]
    fn default_is_three_attempts_two_seconds_apart() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn gives_up_after_the_configured_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), String> = quick(3)
            .run("always-fails", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("boom".to_string()) }
            })
            .await;
        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let calls = AtomicUsize::new(0);
        let result = quick(3)
            .run("flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err("transient".to_string())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn single_attempt_never_retries() {
        let calls = AtomicUsize::new(0);
        let _ = quick(0)
            .run("once", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("no".to_string()) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
