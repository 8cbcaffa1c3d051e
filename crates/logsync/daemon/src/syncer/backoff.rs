//! Delay between sync cycles

use std::time::Duration;

/// Fixed interval in the steady state, capped exponential growth while
/// cycles keep failing.
#[derive(Debug, Clone)]
pub struct CycleBackoff {
    interval: Duration,
    max: Duration,
    consecutive_failures: u32,
}

impl CycleBackoff {
    pub fn new(interval: Duration, max: Duration) -> Self {
        Self {
            interval,
            max: max.max(interval),
            consecutive_failures: 0,
        }
    }

    /// Record the outcome of a cycle and return the delay before the next one.
    pub fn next_delay(&mut self, failed: bool) -> Duration {
        if !failed {
            self.consecutive_failures = 0;
            return self.interval;
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let factor = 2u32.saturating_pow(self.consecutive_failures);
        self.interval.saturating_mul(factor).min(self.max)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
