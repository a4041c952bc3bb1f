//! Monotonic clocks
//!
//! Times are plain `i64` milliseconds with no fixed epoch. Only differences
//! between two readings of the same clock are meaningful.

use std::cell::Cell;
use std::time::Instant;

/// Epoch-free monotonic millisecond clock
pub trait Clock {
    fn now_millis(&self) -> i64;
}

/// Wall-independent clock backed by [`Instant`]
///
/// Readings count from the moment the clock was created.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}

/// Clock that only moves when told to
///
/// Used by tests and by hosts that replay recorded frame times.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, now: i64) {
        self.now.set(now);
    }

    /// Move forward by `millis`
    pub fn advance(&self, millis: i64) {
        self.now.set(self.now.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.get()
    }
}
