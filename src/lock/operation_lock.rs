//! Single condition-variable lock

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Fixed wait bound for one notification.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(5000);

/// Decides whether a waiter may return.
pub trait ProcessOperationLockReleaseStrategy: Sync {
    fn is_ready_to_release(&self) -> bool;
}

impl<F> ProcessOperationLockReleaseStrategy for F
where
    F: Fn() -> bool + Sync,
{
    fn is_ready_to_release(&self) -> bool {
        self()
    }
}

/// A mutex-guarded notification counter with its condition variable.
#[derive(Debug)]
pub struct ProcessOperationLock {
    notifications: Mutex<u64>,
    condition: Condvar,
    timeout: Duration,
}

impl ProcessOperationLock {
    pub fn new(timeout: Duration) -> Self {
        Self {
            notifications: Mutex::new(0),
            condition: Condvar::new(),
            timeout,
        }
    }

    fn guard(&self) -> MutexGuard<'_, u64> {
        // The counter stays meaningful after a panicking holder.
        self.notifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Block until `strategy` reports ready.
    ///
    /// The strategy is checked up front and after every notification. Returns
    /// `false` when a full timeout passes without a notification.
    pub fn await_release(&self, strategy: &dyn ProcessOperationLockReleaseStrategy) -> bool {
        let mut guard = self.guard();
        loop {
            if strategy.is_ready_to_release() {
                return true;
            }
            let seen = *guard;
            let (next, result) = self
                .condition
                .wait_timeout_while(guard, self.timeout, |count| *count == seen)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if result.timed_out() {
                return false;
            }
            guard = next;
        }
    }

    /// Wake every waiter.
    pub fn do_notify(&self) {
        let mut guard = self.guard();
        *guard = guard.wrapping_add(1);
        self.condition.notify_all();
    }
}

impl Default for ProcessOperationLock {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}
