//! Routing/execution counters
//!
//! Counters only, monotonic, reset on process start. One registry per node
//! process, shared by `Arc` with whatever routes or executes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters for the routing/execution core.
///
/// Relaxed ordering throughout: counters are observational and never used to
/// synchronize other state.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    routes_computed: AtomicU64,
    route_failures: AtomicU64,
    route_units: AtomicU64,
    groups_prepared: AtomicU64,
    connection_failures: AtomicU64,
    units_executed: AtomicU64,
    unit_failures: AtomicU64,
    failures_suppressed: AtomicU64,
    sane_results_kept: AtomicU64,
    sane_results_discarded: AtomicU64,
    lock_waits: AtomicU64,
    lock_timeouts: AtomicU64,
    lock_replacements: AtomicU64,
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub routes_computed: u64,
    pub route_failures: u64,
    pub route_units: u64,
    pub groups_prepared: u64,
    pub connection_failures: u64,
    pub units_executed: u64,
    pub unit_failures: u64,
    pub failures_suppressed: u64,
    pub sane_results_kept: u64,
    pub sane_results_discarded: u64,
    pub lock_waits: u64,
    pub lock_timeouts: u64,
    pub lock_replacements: u64,
}

impl MetricsRegistry {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Routing

    /// Record a successful route producing `units` route units
    pub fn record_route(&self, units: usize) {
        self.routes_computed.fetch_add(1, Ordering::Relaxed);
        self.route_units.fetch_add(units as u64, Ordering::Relaxed);
    }

    pub fn increment_route_failures(&self) {
        self.route_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Preparation

    pub fn add_groups_prepared(&self, groups: usize) {
        self.groups_prepared.fetch_add(groups as u64, Ordering::Relaxed);
    }

    pub fn increment_connection_failures(&self) {
        self.connection_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Execution

    pub fn increment_units_executed(&self) {
        self.units_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unit_failures(&self) {
        self.unit_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failures_suppressed(&self) {
        self.failures_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sane_results_kept(&self) {
        self.sane_results_kept.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sane_results_discarded(&self) {
        self.sane_results_discarded.fetch_add(1, Ordering::Relaxed);
    }

    // Operation locks

    pub fn increment_lock_waits(&self) {
        self.lock_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_lock_timeouts(&self) {
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_lock_replacements(&self) {
        self.lock_replacements.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            routes_computed: load(&self.routes_computed),
            route_failures: load(&self.route_failures),
            route_units: load(&self.route_units),
            groups_prepared: load(&self.groups_prepared),
            connection_failures: load(&self.connection_failures),
            units_executed: load(&self.units_executed),
            unit_failures: load(&self.unit_failures),
            failures_suppressed: load(&self.failures_suppressed),
            sane_results_kept: load(&self.sane_results_kept),
            sane_results_discarded: load(&self.sane_results_discarded),
            lock_waits: load(&self.lock_waits),
            lock_timeouts: load(&self.lock_timeouts),
            lock_replacements: load(&self.lock_replacements),
        }
    }

    /// Serialize the current snapshot as a JSON object
    pub fn to_json(&self) -> String {
        // A flat struct of integers cannot fail to serialize.
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}
