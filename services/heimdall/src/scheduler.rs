//! Countdown timer driving the periodic action

use std::time::Duration;

/// Wall-clock countdown: one [`tick`](Countdown::tick) per second, firing
/// when the count reaches zero and resetting to the configured interval.
///
/// The interval can be swapped at runtime (short while focused, long while
/// unfocused); the new interval takes effect at the next reset.
#[derive(Debug)]
pub struct Countdown {
    interval: u64,
    remaining: u64,
}

impl Countdown {
    pub fn new(interval: Duration) -> Self {
        let interval = interval.as_secs().max(1);
        Self {
            interval,
            remaining: interval,
        }
    }

    /// Advance one second. Returns true when the action should fire; the
    /// countdown has then already been reset to the full interval.
    pub fn tick(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
        }
        if self.remaining == 0 {
            self.remaining = self.interval;
            true
        } else {
            false
        }
    }

    /// Force the next tick to fire
    pub fn expire(&mut self) {
        self.remaining = 0;
    }

    /// Swap the reset interval; applied at the next reset
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval.as_secs().max(1);
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}
