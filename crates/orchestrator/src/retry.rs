//! Retry policy with capped exponential backoff.

use std::collections::HashSet;
use std::time::Duration;

use common::ErrorKind;

/// How failed activity attempts are retried.
///
/// The delay before attempt `n + 1` grows geometrically from
/// `initial_interval` and is capped at `max_interval`. An error is retried
/// only while its kind is not in the non-retryable set and the attempt budget
/// is not exhausted; the terminal error keeps its original kind.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    initial_interval: Duration,
    max_interval: Duration,
    backoff_coefficient: f64,
    max_attempts: u32,
    non_retryable: HashSet<ErrorKind>,
}

impl RetryPolicy {
    /// Creates a policy with an empty non-retryable set.
    ///
    /// # Panics
    ///
    /// Panics when `initial_interval > max_interval` or `max_attempts == 0`.
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        backoff_coefficient: f64,
        max_attempts: u32,
    ) -> Self {
        assert!(
            initial_interval <= max_interval,
            "initial_interval must not exceed max_interval"
        );
        assert!(max_attempts >= 1, "max_attempts must be at least 1");
        assert!(
            backoff_coefficient >= 0.0,
            "backoff_coefficient must be non-negative"
        );

        Self {
            initial_interval,
            max_interval,
            backoff_coefficient,
            max_attempts,
            non_retryable: HashSet::new(),
        }
    }

    /// The stock payment policy: 1s initial, 20s cap, doubling, 5000
    /// attempts, with validation, authorization and conflict failures
    /// never retried.
    pub fn standard() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(20), 2.0, 5000).with_non_retryable([
            ErrorKind::Validation,
            ErrorKind::Auth,
            ErrorKind::Conflict,
        ])
    }

    /// Replaces the non-retryable error kinds.
    pub fn with_non_retryable(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.non_retryable = kinds.into_iter().collect();
        self
    }

    /// Replaces the attempt budget.
    ///
    /// # Panics
    ///
    /// Panics when `max_attempts == 0`.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        assert!(max_attempts >= 1, "max_attempts must be at least 1");
        self.max_attempts = max_attempts;
        self
    }

    /// Returns the configured attempt budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether the given kind is never retried under this policy.
    pub fn is_non_retryable(&self, kind: ErrorKind) -> bool {
        self.non_retryable.contains(&kind)
    }

    /// Whether a failure of `kind` on 1-indexed attempt `attempt` may be
    /// retried.
    pub fn permits(&self, kind: ErrorKind, attempt: u32) -> bool {
        !self.is_non_retryable(kind) && attempt < self.max_attempts
    }

    /// Backoff delay after 1-indexed attempt `attempt` failed.
    ///
    /// `min(initial * coefficient^(attempt - 1), max_interval)`, computed in
    /// milliseconds. A coefficient of 1 yields a constant delay.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let raw = self.initial_interval.as_millis() as f64
            * self.backoff_coefficient.powi(exponent as i32);
        let capped = raw.min(self.max_interval.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
