//! Retry policy for remote fetches.

use std::time::Duration;

/// How often a failed fetch is attempted before the load gives up.
///
/// Only failures the service marks as retryable are retried; sync checks are
/// never retried. The delay doubles after each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Up to `max_attempts` attempts with exponential backoff starting at `backoff`.
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub(crate) fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1)
    }

    /// Delay to wait after attempt number `attempt` (1-based) failed.
    pub(crate) fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
