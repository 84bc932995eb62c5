//! Interactive lock
//!
//! Advisory lock taken by the local UI and the remote interface before
//! they start or stop a run or change persisted settings. The periodic
//! control ticks never take it. Acquisition never waits: a second
//! interactive user is turned away instead of queued.

use portable_atomic::{AtomicBool, Ordering};

pub struct InteractiveLock {
    held: AtomicBool,
}

impl InteractiveLock {
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Take the lock if it is free
    pub fn try_lock(&self) -> Option<InteractiveGuard<'_>> {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| InteractiveGuard { lock: self })
    }

    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }
}

impl Default for InteractiveLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Held interactive lock; released on drop
#[must_use]
pub struct InteractiveGuard<'a> {
    lock: &'a InteractiveLock,
}

impl Drop for InteractiveGuard<'_> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}
