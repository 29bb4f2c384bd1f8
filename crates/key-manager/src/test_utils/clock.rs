use std::cell::Cell;

use crate::Clock;

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    /// Creates a clock reading `now`.
    pub const fn new(now: u64) -> Self {
        Self { now: Cell::new(now) }
    }

    /// Sets the time.
    pub fn set(&self, now: u64) {
        self.now.set(now);
    }

    /// Moves the time forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.get()
    }
}
