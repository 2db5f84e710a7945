//! # Exponential Backoff
//!
//! Retry delays for failed reconciliations.
//! Sequence with a 5s base: 5s, 10s, 20s, 40s, ... capped at the configured maximum.

use std::time::Duration;

/// Exponential backoff calculator
///
/// Stateless: the delay is derived from the number of consecutive failures,
/// which the reconciler tracks per resource and resets on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    /// Delay after the first failure
    base: Duration,
    /// Ceiling for any delay
    max: Duration,
}

impl ExponentialBackoff {
    /// Create a backoff growing from `base`, never exceeding `max`
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay after `failures` consecutive failures (1-indexed)
    ///
    /// Returns `base * 2^(failures-1)`, capped at `max`. A count of zero is
    /// treated as the first failure.
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.base
            .saturating_mul(1u32 << exponent)
            .min(self.max)
    }
}
