//! A minimal interval timer for the keep-alive clock (§3, §4.G).

use std::time::{Duration, Instant};

/// Fires at most once per `interval`, tracked from the last time it fired.
#[derive(Debug, Clone, Copy)]
pub struct Repeater {
    interval: Duration,
    last_fired: Instant,
}

impl Repeater {
    pub fn every(interval: Duration) -> Self {
        Self { interval, last_fired: Instant::now() }
    }

    /// Returns `true` and resets the clock if `interval` has elapsed since
    /// the last fire (or since construction).
    pub fn fired(&mut self) -> bool {
        if self.last_fired.elapsed() >= self.interval {
            self.last_fired = Instant::now();
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.last_fired = Instant::now();
    }
}
