use std::time::{SystemTime, UNIX_EPOCH};

use auto_impl::auto_impl;

/// Source of the current time, in seconds since the Unix epoch.
///
/// Used to check the validity window of relay calls.
#[auto_impl(&, Rc, Arc, Box)]
pub trait Clock {
    /// The current timestamp.
    fn now(&self) -> u64;
}

/// The wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_secs()).unwrap_or(0)
    }
}
