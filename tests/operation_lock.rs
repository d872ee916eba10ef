//! Operation Lock Tests
//!
//! A waiter on a named key returns once another thread notifies the key and
//! the release strategy reports ready.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use aeroshard::lock::{ProcessOperationLock, ProcessOperationLockRegistry};

#[test]
fn test_notify_releases_background_waiter() {
    let registry = Arc::new(ProcessOperationLockRegistry::new());
    let ready = Arc::new(AtomicBool::new(false));

    let waiter = {
        let registry = Arc::clone(&registry);
        let ready = Arc::clone(&ready);
        thread::spawn(move || {
            let started = Instant::now();
            let released = registry.wait_until_release_ready("checkpoint-7", &move || ready.load(Ordering::SeqCst));
            (released, started.elapsed())
        })
    };

    let deadline = Instant::now() + Duration::from_secs(2);
    while !registry.has_waiter("checkpoint-7") {
        assert!(Instant::now() < deadline);
        thread::sleep(Duration::from_millis(1));
    }
    ready.store(true, Ordering::SeqCst);
    registry.notify("checkpoint-7");

    let (released, elapsed) = waiter.join().unwrap();
    assert!(released);
    assert!(elapsed < Duration::from_secs(5));
    assert!(registry.is_empty());
}

#[test]
fn test_short_lock_times_out() {
    let lock = ProcessOperationLock::new(Duration::from_millis(30));
    let started = Instant::now();
    assert!(!lock.await_release(&|| false));
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[test]
fn test_notify_unknown_key_is_noop() {
    let registry = ProcessOperationLockRegistry::new();
    registry.notify("nobody-waits");
    assert!(!registry.has_waiter("nobody-waits"));
}
