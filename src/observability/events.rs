//! Observable routing and execution events
//!
//! Events are explicit and typed; log sites never invent event names.

use std::fmt;

/// Observable events emitted by the routing/execution core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Sharding rule compiled from configuration
    RuleLoaded,

    // Routing
    /// Route context computed
    RouteComplete,
    /// Routing failed
    RouteFailed,

    // Preparation
    /// Execution groups built for all data sources
    PrepareComplete,
    /// Connection provider failed for a data source
    ConnectionAcquireFailed,

    // Execution
    /// Parallel execution started
    ExecuteStart,
    /// Parallel execution finished
    ExecuteComplete,
    /// Parallel execution failed with a propagated error
    ExecuteFailed,
    /// Parallel execution stopped by interruption
    ExecuteInterrupted,
    /// Unit failure logged and dropped by the exception policy
    UnitFailureSuppressed,
    /// Sane result kept on the trunk thread
    SaneResultSubstituted,
    /// Sane result dropped on an auxiliary thread
    SaneResultDiscarded,

    // Operation locks
    /// Waiter registered on an operation lock
    OperationLockWait,
    /// Waiter released normally
    OperationLockReleased,
    /// Waiter gave up after the timeout
    OperationLockTimeout,
    /// A second waiter replaced the registered lock for a key
    OperationLockReplaced,
}

impl Event {
    /// Returns the event name as logged
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::RuleLoaded => "RULE_LOADED",
            Event::RouteComplete => "ROUTE_COMPLETE",
            Event::RouteFailed => "ROUTE_FAILED",
            Event::PrepareComplete => "PREPARE_COMPLETE",
            Event::ConnectionAcquireFailed => "CONNECTION_ACQUIRE_FAILED",
            Event::ExecuteStart => "EXECUTE_START",
            Event::ExecuteComplete => "EXECUTE_COMPLETE",
            Event::ExecuteFailed => "EXECUTE_FAILED",
            Event::ExecuteInterrupted => "EXECUTE_INTERRUPTED",
            Event::UnitFailureSuppressed => "UNIT_FAILURE_SUPPRESSED",
            Event::SaneResultSubstituted => "SANE_RESULT_SUBSTITUTED",
            Event::SaneResultDiscarded => "SANE_RESULT_DISCARDED",
            Event::OperationLockWait => "OPERATION_LOCK_WAIT",
            Event::OperationLockReleased => "OPERATION_LOCK_RELEASED",
            Event::OperationLockTimeout => "OPERATION_LOCK_TIMEOUT",
            Event::OperationLockReplaced => "OPERATION_LOCK_REPLACED",
        }
    }

    /// Events that describe a failure the caller will see.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::RouteFailed
                | Event::ConnectionAcquireFailed
                | Event::ExecuteFailed
                | Event::ExecuteInterrupted
        )
    }

    /// Events that describe a degraded but non-failing outcome.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Event::UnitFailureSuppressed
                | Event::SaneResultDiscarded
                | Event::OperationLockTimeout
                | Event::OperationLockReplaced
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
