//! The reentrancy guard shared by every entry point that forwards into the account.

use std::cell::Cell;

/// A dispatch was attempted while the guard is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("reentrant call")]
pub struct ReentrancyDetected;

/// A single-slot lock held for the whole forwarded call, nested calls included.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: Cell<bool>,
}

impl ReentrancyGuard {
    /// Creates an unlocked guard.
    pub const fn new() -> Self {
        Self { entered: Cell::new(false) }
    }

    /// Returns `true` while a dispatch holds the guard.
    pub fn is_entered(&self) -> bool {
        self.entered.get()
    }

    /// Takes the guard.
    ///
    /// If the guard is already held, fails unless `allow_reentry` is set, in which case the
    /// returned lock does not own the guard and leaves it held when dropped.
    pub fn enter(&self, allow_reentry: bool) -> Result<GuardLock<'_>, ReentrancyDetected> {
        if self.entered.replace(true) {
            if allow_reentry {
                return Ok(GuardLock { guard: self, acquired: false });
            }
            return Err(ReentrancyDetected);
        }
        Ok(GuardLock { guard: self, acquired: true })
    }
}

/// Releases the guard when dropped, on every exit path.
#[must_use = "the guard is released as soon as the lock is dropped"]
#[derive(Debug)]
pub struct GuardLock<'a> {
    guard: &'a ReentrancyGuard,
    acquired: bool,
}

impl Drop for GuardLock<'_> {
    fn drop(&mut self) {
        if self.acquired {
            self.guard.entered.set(false);
        }
    }
}
