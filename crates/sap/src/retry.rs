//! Retry policy for transient HTTP failures
//!
//! Only responses whose status is in the retryable set are retried; transport
//! errors and other statuses are returned to the caller immediately.

use std::time::Duration;

/// Statuses retried by default
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub max_retries: u32,
    /// Base delay; retry `n` waits `backoff_factor * 2^(n-1)`
    pub backoff_factor: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// HTTP statuses that trigger a retry
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_secs(1),
            max_delay: Duration::from_secs(120),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether a response with this status may be retried
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Whether another attempt is allowed after `retry` retries have been made
    pub fn should_retry(&self, status: u16, retry: u32) -> bool {
        retry < self.max_retries && self.is_retryable(status)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exponent = (retry - 1).min(16);
        let delay = self.backoff_factor.saturating_mul(1u32 << exponent);
        delay.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(5),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(10), Duration::from_secs(5));
    }

    #[test]
    fn test_only_listed_statuses_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(503, 0));
        assert!(policy.should_retry(429, 2));
        assert!(!policy.should_retry(503, 3));
        assert!(!policy.should_retry(404, 0));
        assert!(!policy.should_retry(401, 0));
        assert!(!RetryPolicy::none().should_retry(500, 0));
    }
}
