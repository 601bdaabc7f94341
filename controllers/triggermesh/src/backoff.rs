//! # Exponential Backoff
//!
//! Capped exponential backoff for failed reconciliations. Each key gets its own
//! sequence, which the reconciler resets after a successful reconcile.
//!
//! Sequence with the defaults: 5s, 10s, 20s, 40s, 80s, 160s, 300s (max).

use std::time::Duration;

/// Exponential backoff calculator
///
/// Every call to `next_backoff_seconds()` returns the current delay and
/// doubles it for the next call, never exceeding `max_seconds`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Delay of the first retry, in seconds
    base_seconds: u64,
    /// Delay returned by the next call, in seconds
    current_seconds: u64,
    /// Upper bound of the delay, in seconds
    max_seconds: u64,
}

impl ExponentialBackoff {
    /// Create a new backoff starting at `base_seconds` and capped at `max_seconds`
    ///
    /// # Arguments
    ///
    /// * `base_seconds` - Delay of the first retry (at least one second)
    /// * `max_seconds` - Cap of the sequence
    #[must_use]
    pub fn new(base_seconds: u64, max_seconds: u64) -> Self {
        let base_seconds = base_seconds.max(1);
        Self {
            base_seconds,
            current_seconds: base_seconds.min(max_seconds),
            max_seconds,
        }
    }

    /// Get the next backoff duration in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result = self.current_seconds;
        self.current_seconds = self.current_seconds.saturating_mul(2).min(self.max_seconds);
        result
    }

    /// Get the next backoff duration as a `Duration` and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.current_seconds = self.base_seconds.min(self.max_seconds);
    }

    /// Calculate the backoff for a given number of consecutive errors (stateless)
    ///
    /// `error_count` 0 and 1 both yield `base_seconds`; every further error
    /// doubles the delay, capped at `max_seconds`.
    #[must_use]
    pub fn calculate_for_error_count(error_count: u32, base_seconds: u64, max_seconds: u64) -> Duration {
        let exponent = error_count.saturating_sub(1).min(63);
        let seconds = base_seconds
            .max(1)
            .checked_mul(1u64 << exponent)
            .unwrap_or(u64::MAX)
            .min(max_seconds);
        Duration::from_secs(seconds)
    }
}
