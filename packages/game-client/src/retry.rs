use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::errors::TransportError;

/// Bounded retries with exponential backoff and jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff ceiling after the `failures`-th failed attempt.
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Sleep before the next attempt: somewhere between half and all of
    /// the backoff ceiling.
    pub fn delay_for(&self, failures: u32) -> Duration {
        let ceiling = self.backoff(failures);
        let half = ceiling / 2;
        let spread = u64::try_from((ceiling - half).as_millis()).unwrap_or(u64::MAX);
        half + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }
}

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or
/// the policy runs out of attempts. Each attempt is bounded by the
/// policy's timeout.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut failures = 0;
    loop {
        let result = tokio::time::timeout(policy.attempt_timeout, attempt())
            .await
            .unwrap_or(Err(TransportError::Timeout));

        match result {
            Ok(value) => return Ok(value),
            Err(err) => {
                failures += 1;
                if !err.is_retryable() {
                    debug!("Not retrying: {}", err);
                    return Err(err);
                }
                if failures >= max_attempts {
                    warn!("Giving up after {} attempts: {}", failures, err);
                    return Err(err);
                }
                let delay = policy.delay_for(failures);
                debug!("Attempt {} failed ({}), retrying in {:?}", failures, err, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            attempt_timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(10), Duration::from_secs(8));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for failures in 1..6 {
            let ceiling = policy.backoff(failures);
            for _ in 0..50 {
                let delay = policy.delay_for(failures);
                assert!(delay >= ceiling / 2 && delay <= ceiling, "{:?}", delay);
            }
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);

        let result = retry(&fast_policy(4), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(TransportError::Network("connection reset".into()))
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_on_non_retryable_error() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry(&fast_policy(4), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Decode("bad json".into()))
        })
        .await;

        assert!(matches!(result, Err(TransportError::Decode(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_attempts_time_out() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry(&fast_policy(2), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert_eq!(result, Err(TransportError::Timeout));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
