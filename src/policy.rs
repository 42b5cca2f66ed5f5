//! Retry policy for the backoff decorator.

use crate::settings::ApiConfig;
use std::time::Duration;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for linear backoff.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Bounded retry with linearly increasing delay.
///
/// After the `n`th failed attempt the decorator waits `retry_delay * n` before
/// trying again, for `n` in `1..=max_retries`.
///
/// ```rust
/// use fetchguard_rs::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(2, Duration::from_millis(1000));
///
/// assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(1000)));
/// assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(2000)));
/// assert_eq!(policy.delay_for_attempt(3), None);
/// assert_eq!(policy.max_attempts(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` retries with base delay `retry_delay`.
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    /// Builds the policy described by the process configuration.
    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.retry_attempts(), config.retry_delay())
    }

    /// Sets the number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base delay.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Number of retries after the initial attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Base delay multiplied by the attempt number.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Upper bound on producer invocations per execution.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after failed attempt `attempt` (1-based), or `None` when
    /// no retry follows it.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_retries {
            return None;
        }

        Some(self.retry_delay.saturating_mul(attempt))
    }

    /// Sum of every delay the policy can schedule.
    pub fn total_backoff(&self) -> Duration {
        (1..=self.max_retries)
            .filter_map(|attempt| self.delay_for_attempt(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}
