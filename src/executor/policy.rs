//! Exception policy
//!
//! Decides, once per logical call, whether a unit failure aborts the call or
//! is logged and treated as "no result" for that unit.

use crate::observability::{log_event, Event, MetricsRegistry};

use super::errors::{ExecutionError, ExecutionResult};

/// Per-call failure policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionPolicy {
    /// Propagate unit failures to the caller
    pub exception_thrown: bool,
}

impl ExceptionPolicy {
    /// Client-facing calls
    pub fn throwing() -> Self {
        Self {
            exception_thrown: true,
        }
    }

    /// Best-effort fan-out (e.g. DDL pushed to every shard)
    pub fn suppressing() -> Self {
        Self {
            exception_thrown: false,
        }
    }

    /// Re-signal `error`, or log it and return normally.
    ///
    /// `Ok(())` means the unit contributes nothing.
    pub fn handle(&self, error: ExecutionError, metrics: Option<&MetricsRegistry>) -> ExecutionResult<()> {
        if self.exception_thrown {
            return Err(error);
        }
        if let Some(metrics) = metrics {
            metrics.increment_failures_suppressed();
        }
        log_event(
            Event::UnitFailureSuppressed,
            &[("code", error.code()), ("error", &error.to_string())],
        );
        Ok(())
    }
}

impl Default for ExceptionPolicy {
    fn default() -> Self {
        Self::throwing()
    }
}
