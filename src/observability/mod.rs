//! Observability subsystem
//!
//! - Structured logging (one JSON object per line)
//! - Typed lifecycle events for routing, execution and operation locks
//! - Monotonic counters
//!
//! Observability is read-only: nothing here changes a routing decision or an
//! execution outcome, and logging failures are swallowed.
//!
//! ```ignore
//! use aeroshard::observability::{log_event, Event, MetricsRegistry};
//!
//! log_event(Event::RouteComplete, &[("units", "2")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.record_route(2);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Severity a lifecycle event is logged at.
pub fn severity_of(event: Event) -> Severity {
    if event.is_failure() {
        Severity::Error
    } else if event.is_degraded() {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event with fields
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_of(event), event.as_str(), fields);
}
