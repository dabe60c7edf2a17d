// File: modbot-core/src/resilience.rs

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use modbot_common::error::Error;

/// Retry, backoff and timeout settings wrapped around one unreliable call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Budget for all attempts and backoff sleeps together.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub enum RetryOutcome<T> {
    Completed { value: T, attempts: u32 },
    /// Every attempt failed; carries the last error.
    Exhausted { attempts: u32, last_error: Error },
    TimedOut { attempts: u32 },
    Cancelled { attempts: u32 },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Completed { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::TimedOut { attempts }
            | RetryOutcome::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RetryOutcome::Completed { .. })
    }
}

enum Stop {
    Cancelled,
    Exhausted(Error),
}

impl RetryPolicy {
    /// Sleep before retry number `retry` (1-based): exponential from
    /// `base_delay` plus up to a quarter of random jitter, capped at `max_delay`.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        let baseline = self.base_delay.saturating_mul(1 << exp).min(self.max_delay);
        let jitter_bound = (baseline / 4).as_millis() as u64;
        let jitter = if jitter_bound == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..=jitter_bound))
        };
        (baseline + jitter).min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, retries run out, the overall timeout
    /// elapses or `cancel` fires. Each attempt receives a child of `cancel`.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut attempts = 0u32;
        let attempt_token = cancel.child_token();

        let retry_loop = async {
            loop {
                attempts += 1;
                let err = match operation(attempt_token.clone()).await {
                    Ok(value) => return Ok(value),
                    Err(e) => e,
                };
                if cancel.is_cancelled() {
                    return Err(Stop::Cancelled);
                }
                if attempts > self.max_retries {
                    return Err(Stop::Exhausted(err));
                }
                let delay = self.backoff_delay(attempts);
                warn!(attempt = attempts, ?delay, "Attempt failed, retrying: {err}");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(Stop::Cancelled),
                    _ = sleep(delay) => {}
                }
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(Err(Stop::Cancelled)),
            r = timeout(self.timeout, retry_loop) => r,
        };
        attempt_token.cancel();

        match result {
            Ok(Ok(value)) => RetryOutcome::Completed { value, attempts },
            Ok(Err(Stop::Exhausted(last_error))) => RetryOutcome::Exhausted { attempts, last_error },
            Ok(Err(Stop::Cancelled)) => RetryOutcome::Cancelled { attempts },
            Err(_) => RetryOutcome::TimedOut { attempts },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn backoff_grows_and_stays_bounded() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let first = policy.backoff_delay(1);
            assert!(first >= Duration::from_secs(2) && first <= Duration::from_millis(2500));
            let second = policy.backoff_delay(2);
            assert!(second >= Duration::from_secs(4) && second <= Duration::from_secs(5));
            assert!(policy.backoff_delay(30) <= policy.max_delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let outcome = fast_policy()
            .execute(&CancellationToken::new(), move |_| {
                let n = c.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 { Err(Error::Platform("flaky".into())) } else { Ok(n) }
                }
            })
            .await;

        assert!(matches!(outcome, RetryOutcome::Completed { value: 2, attempts: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let outcome: RetryOutcome<()> = fast_policy()
            .execute(&CancellationToken::new(), |_| async {
                Err(Error::Platform("down".into()))
            })
            .await;
        match outcome {
            RetryOutcome::Exhausted { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(matches!(last_error, Error::Platform(_)));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overall_timeout_covers_all_attempts() {
        let policy = RetryPolicy { timeout: Duration::from_secs(2), ..fast_policy() };
        let outcome: RetryOutcome<()> = policy
            .execute(&CancellationToken::new(), |_| async {
                sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(outcome, RetryOutcome::TimedOut { attempts: 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_without_retrying() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let token = cancel.clone();
        let outcome: RetryOutcome<()> = fast_policy()
            .execute(&cancel, move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                token.cancel();
                async { Err(Error::Platform("interrupted".into())) }
            })
            .await;
        assert!(matches!(outcome, RetryOutcome::Cancelled { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
