//! Executor callbacks
//!
//! [`ExecutorCallback`] is what the engine invokes per unit. [`StorageCallback`]
//! is the standard adapter over a [`StorageExecutor`]: it runs the unit and,
//! on failure, either substitutes a sane result or hands the error to the
//! exception policy of the call's [`ExecutionScope`].
//!
//! # Sane results
//!
//! When a unit fails and its data source's storage type differs from the
//! protocol type the client speaks, the storage executor may offer a
//! type-appropriate placeholder (empty result, zero rows). It is kept only on
//! the trunk thread; auxiliary threads drop it so aggregation never sees
//! duplicate placeholders.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event, Event, MetricsRegistry};

use super::errors::{ExecutionError, ExecutionResult, StorageError};
use super::scope::{ExecutionScope, InterruptHandle};
use super::unit::StatementExecuteUnit;

/// Per-unit callback.
///
/// `Ok(None)` means the unit contributes no result. `scope` is the scope of
/// the call the unit belongs to.
pub trait ExecutorCallback<I, O>: Sync {
    fn execute(&self, input: &I, is_trunk_thread: bool, scope: &ExecutionScope) -> ExecutionResult<Option<O>>;
}

impl<I, O, F> ExecutorCallback<I, O> for F
where
    F: Fn(&I, bool, &ExecutionScope) -> ExecutionResult<Option<O>> + Sync,
{
    fn execute(&self, input: &I, is_trunk_thread: bool, scope: &ExecutionScope) -> ExecutionResult<Option<O>> {
        self(input, is_trunk_thread, scope)
    }
}

/// Database dialects, as storage or protocol type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseType {
    MySQL,
    PostgreSQL,
    #[serde(rename = "openGauss")]
    OpenGauss,
    Oracle,
    SQLServer,
    H2,
    Firebird,
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::MySQL => "MySQL",
            DatabaseType::PostgreSQL => "PostgreSQL",
            DatabaseType::OpenGauss => "openGauss",
            DatabaseType::Oracle => "Oracle",
            DatabaseType::SQLServer => "SQLServer",
            DatabaseType::H2 => "H2",
            DatabaseType::Firebird => "Firebird",
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs one statement unit on its connection.
pub trait StorageExecutor<C>: Sync {
    type Output;

    /// Long-running statements should poll `interrupt` and give up once it
    /// is set.
    fn execute_unit(
        &self,
        unit: &StatementExecuteUnit<C>,
        interrupt: &InterruptHandle,
    ) -> Result<Self::Output, StorageError>;

    /// Placeholder result for a failure caused by a dialect mismatch.
    fn sane_result(
        &self,
        _protocol_type: DatabaseType,
        _storage_type: DatabaseType,
        _unit: &StatementExecuteUnit<C>,
    ) -> Option<Self::Output> {
        None
    }
}

/// Callback adapter applying sane-result substitution and the scope's
/// exception policy.
pub struct StorageCallback<E> {
    executor: E,
    protocol_type: DatabaseType,
    storage_types: BTreeMap<String, DatabaseType>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<E> StorageCallback<E> {
    pub fn new(executor: E, protocol_type: DatabaseType) -> Self {
        Self {
            executor,
            protocol_type,
            storage_types: BTreeMap::new(),
            metrics: None,
        }
    }

    /// Storage type of `data_source`; unlisted sources match the protocol type.
    pub fn with_storage_type(mut self, data_source: impl Into<String>, storage_type: DatabaseType) -> Self {
        self.storage_types.insert(data_source.into(), storage_type);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn storage_type(&self, data_source: &str) -> DatabaseType {
        self.storage_types
            .get(data_source)
            .copied()
            .unwrap_or(self.protocol_type)
    }
}

impl<C, E> ExecutorCallback<StatementExecuteUnit<C>, E::Output> for StorageCallback<E>
where
    C: Sync,
    E: StorageExecutor<C>,
    E::Output: Send,
{
    fn execute(
        &self,
        input: &StatementExecuteUnit<C>,
        is_trunk_thread: bool,
        scope: &ExecutionScope,
    ) -> ExecutionResult<Option<E::Output>> {
        let error = match self.executor.execute_unit(input, &scope.interrupt) {
            Ok(output) => return Ok(Some(output)),
            Err(error) => error,
        };
        let metrics = self.metrics.as_deref();
        if let Some(metrics) = metrics {
            metrics.increment_unit_failures();
        }

        let data_source = input.execution_unit.data_source_name.as_str();
        let storage_type = self.storage_type(data_source);
        if storage_type != self.protocol_type {
            if let Some(sane) = self.executor.sane_result(self.protocol_type, storage_type, input) {
                let fields = [
                    ("data_source", data_source),
                    ("protocol_type", self.protocol_type.as_str()),
                    ("storage_type", storage_type.as_str()),
                ];
                if is_trunk_thread {
                    if let Some(metrics) = metrics {
                        metrics.increment_sane_results_kept();
                    }
                    log_event(Event::SaneResultSubstituted, &fields);
                    return Ok(Some(sane));
                }
                if let Some(metrics) = metrics {
                    metrics.increment_sane_results_discarded();
                }
                log_event(Event::SaneResultDiscarded, &fields);
                return Ok(None);
            }
        }

        scope.exception_policy.handle(ExecutionError::Storage(error), metrics)?;
        Ok(None)
    }
}
