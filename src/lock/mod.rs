//! Operation lock registry
//!
//! Named wait/notify points for pausing a coordinated operation until some
//! other thread (typically a cluster-event handler) reports progress.
//!
//! # Contract
//!
//! - One waiter per key. A second waiter on a busy key replaces the first
//!   entry; `notify` then reaches only the newest waiter. Replacement is
//!   logged and counted.
//! - `notify` on a key without a waiter is a no-op.
//! - A wait gives up after 5000 ms without a notification and returns
//!   `false`. Callers re-check their own state either way.

mod operation_lock;
mod registry;

pub use operation_lock::{ProcessOperationLock, ProcessOperationLockReleaseStrategy, DEFAULT_LOCK_TIMEOUT};
pub use registry::ProcessOperationLockRegistry;
