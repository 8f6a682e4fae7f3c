//! Retry policy
//!
//! Exponential backoff without jitter: `min(base * 2^attempt, cap)`.
//! `attempt` is the 0-based index of the retry being considered, so the
//! first retry waits `base`. Rate-limited and transient failures get
//! separate budgets; fatal failures are never retried.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::errors::{ChainResult, ErrorClass};
use crate::utils::constants::{
    RATE_LIMIT_MAX_RETRIES, RETRY_BASE_DELAY_MS, RETRY_MAX_DELAY_MS, TRANSIENT_MAX_RETRIES,
};

/// Outcome of consulting the policy after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub rate_limit_max_retries: u32,
    pub transient_max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: RETRY_BASE_DELAY_MS,
            max_delay_ms: RETRY_MAX_DELAY_MS,
            rate_limit_max_retries: RATE_LIMIT_MAX_RETRIES,
            transient_max_retries: TRANSIENT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Retry budget for a class
    pub fn max_retries(&self, class: ErrorClass) -> u32 {
        match class {
            ErrorClass::RateLimited => self.rate_limit_max_retries,
            ErrorClass::Transient => self.transient_max_retries,
            ErrorClass::Fatal => 0,
        }
    }

    /// Backoff before retry number `attempt` (0-based), capped
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Pure decision: same inputs always give the same answer
    pub fn decide(&self, attempt: u32, class: ErrorClass) -> RetryDecision {
        if attempt < self.max_retries(class) {
            RetryDecision::Retry(self.delay(attempt))
        } else {
            RetryDecision::GiveUp
        }
    }
}

/// Run `op` until it succeeds or the policy gives up
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> ChainResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ChainResult<T>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        match policy.decide(attempt, err.class()) {
            RetryDecision::Retry(delay) => {
                if err.class() == ErrorClass::RateLimited {
                    warn!(
                        "⏳ Rate limited on {}, backing off {}ms (retry {}/{})",
                        label,
                        delay.as_millis(),
                        attempt + 1,
                        policy.max_retries(err.class())
                    );
                } else {
                    debug!(
                        "⏳ Retry {}/{} for {} after {}ms: {}",
                        attempt + 1,
                        policy.max_retries(err.class()),
                        label,
                        delay.as_millis(),
                        err
                    );
                }
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            RetryDecision::GiveUp => {
                if err.class() != ErrorClass::Fatal {
                    warn!("❌ {} failed after {} retries: {}", label, attempt, err);
                }
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ChainError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_rate_limited_schedule() {
        let p = RetryPolicy::default();
        let delays: Vec<_> = (0..5)
            .map(|a| match p.decide(a, ErrorClass::RateLimited) {
                RetryDecision::Retry(d) => d.as_millis() as u64,
                RetryDecision::GiveUp => panic!("gave up early at {}", a),
            })
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
        assert_eq!(p.decide(5, ErrorClass::RateLimited), RetryDecision::GiveUp);
    }

    #[test]
    fn test_transient_schedule() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(0, ErrorClass::Transient), RetryDecision::Retry(Duration::from_millis(1000)));
        assert_eq!(p.decide(2, ErrorClass::Transient), RetryDecision::Retry(Duration::from_millis(4000)));
        assert_eq!(p.decide(3, ErrorClass::Transient), RetryDecision::GiveUp);
    }

    #[test]
    fn test_fatal_never_retries() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(0, ErrorClass::Fatal), RetryDecision::GiveUp);
    }

    #[test]
    fn test_delay_capped() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay(5), Duration::from_millis(30_000));
        assert_eq!(p.delay(20), Duration::from_millis(30_000));
        assert_eq!(p.delay(200), Duration::from_millis(30_000));
    }

    #[test]
    fn test_decide_is_deterministic() {
        let p = RetryPolicy::default();
        for attempt in 0..8 {
            assert_eq!(
                p.decide(attempt, ErrorClass::RateLimited),
                p.decide(attempt, ErrorClass::RateLimited)
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_recovers() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryPolicy::default(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ChainError::timeout("slow"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_exhausts_rate_limit_budget() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let result: ChainResult<()> = with_retry(&RetryPolicy::default(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ChainError::rate_limited("429")) }
        })
        .await;
        assert!(result.is_err());
        // one initial call plus five retries
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(start.elapsed(), Duration::from_millis(31_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_fatal_is_single_call() {
        let calls = AtomicU32::new(0);
        let result: ChainResult<()> = with_retry(&RetryPolicy::default(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ChainError::reverted("Land not ripe")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
