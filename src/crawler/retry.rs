//! Retry policy with exponential backoff
//!
//! The delay before attempt `k` (0-indexed, so the first retry is `k = 1`)
//! is `unit * 2^k`. There is no jitter and no cap other than the attempt
//! count.

use crate::config::{DEFAULT_BACKOFF_UNIT_MS, DEFAULT_MAX_ATTEMPTS};
use async_trait::async_trait;
use std::time::Duration;

/// Attempt cap and backoff unit for fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    max_attempts: u32,

    /// Time unit the exponential delay is expressed in
    backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: Duration::from_millis(DEFAULT_BACKOFF_UNIT_MS),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    /// Returns the maximum number of attempts configured
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the backoff time unit
    pub fn backoff_unit(&self) -> Duration {
        self.backoff_unit
    }

    /// Delay to wait before the given 0-indexed attempt
    ///
    /// # Examples
    ///
    /// ```
    /// use href_harvest::crawler::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(10, Duration::from_secs(1));
    /// assert_eq!(policy.delay_before(0), Duration::ZERO);
    /// assert_eq!(policy.delay_before(1), Duration::from_secs(2));
    /// assert_eq!(policy.delay_before(3), Duration::from_secs(8));
    /// ```
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        self.backoff_unit
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Suspends the current fetch task between attempts
///
/// Injected so tests can observe backoff without waiting for it.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 10);
        assert_eq!(policy.backoff_unit(), Duration::from_secs(1));
    }

    #[test]
    fn test_delays_double() {
        let policy = RetryPolicy::new(10, Duration::from_millis(1));
        let delays: Vec<_> = (1..10).map(|k| policy.delay_before(k)).collect();

        assert_eq!(delays[0], Duration::from_millis(2));
        assert_eq!(delays[1], Duration::from_millis(4));
        assert_eq!(delays[8], Duration::from_millis(512));
    }

    #[test]
    fn test_no_delay_before_first_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(0), Duration::ZERO);
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_secs(1));
        assert_eq!(
            policy.delay_before(64),
            Duration::from_secs(1).saturating_mul(u32::MAX)
        );
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_tokio_sleeper_sleeps() {
        let start = std::time::Instant::now();
        TokioSleeper.sleep(Duration::from_millis(10)).await;
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
