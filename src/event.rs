//! Manual-reset event used to park idle workers and outside waiters.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// A manual-reset event.
///
/// Once triggered it stays signaled, waking every waiter, until `reset`.
#[derive(Default)]
pub struct Event {
    signaled: Mutex<bool>,
    cv: Condvar,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals the event and wakes all waiters.
    pub fn trigger(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        self.cv.notify_all();
    }

    pub fn reset(&self) {
        *self.signaled.lock() = false;
    }

    /// Returns whether the event is currently signaled, without blocking.
    pub fn poll(&self) -> bool {
        *self.signaled.lock()
    }

    /// Blocks until the event is signaled or `timeout` elapses.
    ///
    /// Returns whether the event was signaled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut signaled = self.signaled.lock();
        if !*signaled {
            self.cv.wait_for(&mut signaled, timeout);
        }
        *signaled
    }
}
