//! Delay schedule between poll attempts.

#[cfg(test)]
#[path = "policy_test.rs"]
mod policy_test;

use std::time::Duration;

use super::DEFAULT_POLL_INTERVAL_MS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Same delay after every attempt, forever.
    Fixed { interval: Duration },
    /// `base`, `2 * base`, `4 * base`, ... never exceeding `max`.
    Exponential { base: Duration, max: Duration },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn fixed(interval: Duration) -> Self {
        Self::Fixed { interval }
    }

    #[must_use]
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self::Exponential { base, max }
    }

    /// Delay to wait after the `failures`-th consecutive non-terminal attempt.
    /// `failures` counts from 1.
    #[must_use]
    pub fn delay_after(&self, failures: u32) -> Duration {
        match *self {
            Self::Fixed { interval } => interval,
            Self::Exponential { base, max } => {
                let factor = 1_u32.checked_shl(failures.saturating_sub(1)).unwrap_or(u32::MAX);
                base.saturating_mul(factor).min(max)
            }
        }
    }
}
