//! Keyed registry of operation locks

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::observability::{log_event, Event, MetricsRegistry};

use super::operation_lock::{ProcessOperationLock, ProcessOperationLockReleaseStrategy, DEFAULT_LOCK_TIMEOUT};

type LockMap = HashMap<String, Arc<ProcessOperationLock>>;

/// One per node process; shared by reference or `Arc`.
#[derive(Debug)]
pub struct ProcessOperationLockRegistry {
    locks: Mutex<LockMap>,
    timeout: Duration,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl ProcessOperationLockRegistry {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout: DEFAULT_LOCK_TIMEOUT,
            metrics: None,
        }
    }

    /// Registry with a shorter wait bound.
    pub(crate) fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::new()
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn locks(&self) -> MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Block until `strategy` is ready or the timeout passes.
    ///
    /// Returns `true` when released normally, `false` on timeout. The entry
    /// for `key` is removed when this waiter returns, unless a newer waiter
    /// has replaced it.
    pub fn wait_until_release_ready(
        &self,
        key: &str,
        strategy: &dyn ProcessOperationLockReleaseStrategy,
    ) -> bool {
        let lock = Arc::new(ProcessOperationLock::new(self.timeout));
        let replaced = self
            .locks()
            .insert(key.to_string(), Arc::clone(&lock))
            .is_some();
        if replaced {
            if let Some(metrics) = &self.metrics {
                metrics.increment_lock_replacements();
            }
            log_event(Event::OperationLockReplaced, &[("key", key)]);
        }
        if let Some(metrics) = &self.metrics {
            metrics.increment_lock_waits();
        }
        log_event(Event::OperationLockWait, &[("key", key)]);

        let started = Instant::now();
        let released = lock.await_release(strategy);

        {
            let mut locks = self.locks();
            if locks.get(key).is_some_and(|current| Arc::ptr_eq(current, &lock)) {
                locks.remove(key);
            }
        }

        let elapsed = started.elapsed().as_millis().to_string();
        if released {
            log_event(Event::OperationLockReleased, &[("key", key), ("elapsed_ms", &elapsed)]);
        } else {
            if let Some(metrics) = &self.metrics {
                metrics.increment_lock_timeouts();
            }
            log_event(Event::OperationLockTimeout, &[("key", key), ("elapsed_ms", &elapsed)]);
        }
        released
    }

    /// Wake the waiter on `key`, if any.
    pub fn notify(&self, key: &str) {
        let lock = self.locks().get(key).cloned();
        if let Some(lock) = lock {
            lock.do_notify();
        }
    }

    pub fn has_waiter(&self, key: &str) -> bool {
        self.locks().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.locks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks().is_empty()
    }
}

impl Default for ProcessOperationLockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn wait_for_waiter(registry: &ProcessOperationLockRegistry, key: &str) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !registry.has_waiter(key) {
            assert!(Instant::now() < deadline, "waiter never registered");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_round_trip() {
        let registry = Arc::new(ProcessOperationLockRegistry::with_timeout(Duration::from_secs(5)));
        let ready = Arc::new(AtomicBool::new(false));

        let waiter = {
            let registry = Arc::clone(&registry);
            let ready = Arc::clone(&ready);
            thread::spawn(move || {
                registry.wait_until_release_ready("job-1", &move || ready.load(Ordering::SeqCst))
            })
        };
        wait_for_waiter(&registry, "job-1");
        ready.store(true, Ordering::SeqCst);
        registry.notify("job-1");

        assert!(waiter.join().unwrap());
        assert!(!registry.has_waiter("job-1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_timeout_returns_false_and_cleans_up() {
        let metrics = Arc::new(MetricsRegistry::new());
        let registry =
            ProcessOperationLockRegistry::with_timeout(Duration::from_millis(20)).with_metrics(Arc::clone(&metrics));
        assert!(!registry.wait_until_release_ready("job-2", &|| false));
        assert!(registry.is_empty());
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.lock_waits, 1);
        assert_eq!(snapshot.lock_timeouts, 1);
    }

    #[test]
    fn test_notify_without_waiter_is_noop() {
        let registry = ProcessOperationLockRegistry::new();
        registry.notify("missing");
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_second_waiter_replaces_first() {
        let metrics = Arc::new(MetricsRegistry::new());
        let registry = Arc::new(
            ProcessOperationLockRegistry::with_timeout(Duration::from_millis(300)).with_metrics(Arc::clone(&metrics)),
        );
        let ready = Arc::new(AtomicBool::new(false));

        let first = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.wait_until_release_ready("job-3", &|| false))
        };
        wait_for_waiter(&registry, "job-3");
        thread::sleep(Duration::from_millis(10));

        let second = {
            let registry = Arc::clone(&registry);
            let ready = Arc::clone(&ready);
            thread::spawn(move || {
                registry.wait_until_release_ready("job-3", &move || ready.load(Ordering::SeqCst))
            })
        };
        let deadline = Instant::now() + Duration::from_secs(5);
        while metrics.snapshot().lock_replacements == 0 {
            assert!(Instant::now() < deadline, "second waiter never registered");
            thread::sleep(Duration::from_millis(1));
        }
        ready.store(true, Ordering::SeqCst);
        registry.notify("job-3");

        assert!(second.join().unwrap());
        // The first lock is unreachable and runs out its timeout.
        assert!(!first.join().unwrap());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_default_timeout_is_five_seconds() {
        assert_eq!(ProcessOperationLockRegistry::new().timeout, Duration::from_millis(5000));
    }
}
