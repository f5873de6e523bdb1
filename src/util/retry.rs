//! Retry policy with deterministic exponential backoff.

use std::time::Duration;

/// Retry settings for the externally-effecting workflow stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempt budget, including the first attempt.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on any single backoff delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Delay to wait after `attempt` attempts have already run.
    ///
    /// The schedule doubles from `base_delay_ms` and is capped at
    /// `max_delay_ms`: base, base*2, base*4, ... No jitter is applied so the
    /// schedule stays reproducible in tests.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponential = 1_u64
            .checked_shl(attempt - 1)
            .map_or(u64::MAX, |factor| self.base_delay_ms.saturating_mul(factor));

        Duration::from_millis(exponential.min(self.max_delay_ms))
    }

    /// Whether another attempt is allowed after `attempt` attempts have run.
    #[must_use]
    pub const fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_for_attempt_zero_is_zero() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let config = RetryConfig::new(5, 1000, 60_000);

        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(4000));
    }

    #[test]
    fn delay_respects_cap() {
        let config = RetryConfig::new(10, 1000, 5000);

        assert_eq!(config.delay_for_attempt(8), Duration::from_millis(5000));
    }

    #[test]
    fn can_retry_respects_attempt_budget() {
        let config = RetryConfig::new(3, 1000, 60_000);

        assert!(config.can_retry(1));
        assert!(config.can_retry(2));
        assert!(!config.can_retry(3));
        assert!(!config.can_retry(4));
    }
}
