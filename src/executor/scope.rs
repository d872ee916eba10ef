//! Per-call execution scope
//!
//! Everything one logical call decides up front travels here explicitly:
//! the exception policy, serial mode and the interrupt handle. Nothing is
//! kept in thread-locals or statics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use super::policy::ExceptionPolicy;

/// Cooperative interruption flag shared between a caller and its workers.
///
/// Workers check it before each unit and storage executors receive it for
/// in-flight statements; a raised flag fails the call with `Interrupted`.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Scope of one `execute` call
#[derive(Debug, Clone)]
pub struct ExecutionScope {
    pub execution_id: Uuid,
    pub exception_policy: ExceptionPolicy,
    pub serial: bool,
    pub interrupt: InterruptHandle,
}

impl ExecutionScope {
    /// Client-facing call: failures propagate, groups run in parallel.
    pub fn new(execution_id: Uuid) -> Self {
        Self {
            execution_id,
            exception_policy: ExceptionPolicy::throwing(),
            serial: false,
            interrupt: InterruptHandle::new(),
        }
    }

    pub fn with_exception_policy(mut self, policy: ExceptionPolicy) -> Self {
        self.exception_policy = policy;
        self
    }

    pub fn with_serial(mut self, serial: bool) -> Self {
        self.serial = serial;
        self
    }

    pub fn with_interrupt(mut self, interrupt: InterruptHandle) -> Self {
        self.interrupt = interrupt;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_shared_between_clones() {
        let handle = InterruptHandle::new();
        let scope = ExecutionScope::new(Uuid::new_v4()).with_interrupt(handle.clone());
        assert!(!scope.interrupt.is_interrupted());
        handle.interrupt();
        assert!(scope.interrupt.is_interrupted());
    }

    #[test]
    fn test_defaults() {
        let scope = ExecutionScope::new(Uuid::nil());
        assert!(scope.exception_policy.exception_thrown);
        assert!(!scope.serial);
        let scope = scope
            .with_serial(true)
            .with_exception_policy(ExceptionPolicy::suppressing());
        assert!(scope.serial);
        assert!(!scope.exception_policy.exception_thrown);
    }
}
