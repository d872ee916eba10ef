//! Statement-unit partitioning and execution preparation
//!
//! Units of one data source are split into contiguous chunks, one chunk per
//! physical connection. Connections are acquired before any unit of a chunk
//! is built, so a group without a connection never exists.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::observability::{log_event, Event, MetricsRegistry};

use super::config::ExecutorConfig;
use super::context::ExecutionContext;
use super::errors::{ExecutionError, ExecutionResult, StorageError};
use super::unit::{ConnectionMode, ExecutionUnit, InputGroup, SqlUnit, StatementExecuteUnit};

/// Supplies physical connections; implemented by the connection pool layer.
pub trait ConnectionProvider {
    /// Connection handle; cloned into every unit of a group.
    type Connection: Clone;

    /// Exactly `count` distinct connections to `data_source_name`.
    fn get_connections(
        &self,
        connection_mode: ConnectionMode,
        data_source_name: &str,
        count: usize,
    ) -> Result<Vec<Self::Connection>, StorageError>;
}

/// Units per chunk: `max(ceil(n / m), 1)`.
pub fn partition_size(unit_count: usize, max_connections_size_per_query: usize) -> usize {
    let m = max_connections_size_per_query.max(1);
    unit_count.div_ceil(m).max(1)
}

/// Split one data source's units into connection-sharing groups.
pub fn partition<P: ConnectionProvider>(
    data_source_name: &str,
    sql_units: Vec<SqlUnit>,
    max_connections_size_per_query: usize,
    provider: &P,
) -> ExecutionResult<Vec<InputGroup<StatementExecuteUnit<P::Connection>>>> {
    if sql_units.is_empty() {
        return Ok(Vec::new());
    }
    let unit_count = sql_units.len();
    let connection_mode = ConnectionMode::for_units(max_connections_size_per_query, unit_count);
    let size = partition_size(unit_count, max_connections_size_per_query);
    let group_count = unit_count.div_ceil(size);

    let connections = provider
        .get_connections(connection_mode, data_source_name, group_count)
        .map_err(|e| ExecutionError::ConnectionAcquire {
            data_source: data_source_name.to_string(),
            message: e.message,
        })?;
    if connections.len() < group_count {
        return Err(ExecutionError::InsufficientConnections {
            data_source: data_source_name.to_string(),
            requested: group_count,
            acquired: connections.len(),
        });
    }

    let mut units = sql_units.into_iter();
    let mut groups = Vec::with_capacity(group_count);
    for connection in connections.into_iter().take(group_count) {
        let inputs: Vec<_> = units
            .by_ref()
            .take(size)
            .map(|sql_unit| StatementExecuteUnit {
                execution_unit: ExecutionUnit::new(data_source_name, sql_unit),
                connection_mode,
                connection: connection.clone(),
            })
            .collect();
        groups.push(InputGroup::new(inputs));
    }
    Ok(groups)
}

/// Prepared groups of one execution
#[derive(Debug, Clone)]
pub struct ExecutionGroupContext<T> {
    pub execution_id: Uuid,
    pub input_groups: Vec<InputGroup<T>>,
}

impl<T> ExecutionGroupContext<T> {
    pub fn unit_count(&self) -> usize {
        self.input_groups.iter().map(InputGroup::len).sum()
    }
}

/// Groups an execution context by data source and partitions each.
pub struct ExecutionPrepareEngine<'p, P: ConnectionProvider> {
    provider: &'p P,
    max_connections_size_per_query: usize,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<'p, P: ConnectionProvider> ExecutionPrepareEngine<'p, P> {
    pub fn new(provider: &'p P, max_connections_size_per_query: usize) -> Self {
        Self {
            provider,
            max_connections_size_per_query,
            metrics: None,
        }
    }

    /// Prepare engine for a validated executor configuration.
    pub fn from_config(provider: &'p P, config: &ExecutorConfig) -> ExecutionResult<Self> {
        config.validate()?;
        Ok(Self::new(provider, config.max_connections_size_per_query))
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the input groups for `context`.
    ///
    /// A connection failure aborts preparation; groups already built for
    /// other data sources are dropped with it.
    pub fn prepare(
        &self,
        context: &ExecutionContext,
    ) -> ExecutionResult<ExecutionGroupContext<StatementExecuteUnit<P::Connection>>> {
        let started = Instant::now();
        let execution_id = Uuid::new_v4();
        let mut input_groups = Vec::new();
        for (data_source, units) in context.units_by_data_source() {
            let sql_units = units.into_iter().cloned().collect();
            match partition(data_source, sql_units, self.max_connections_size_per_query, self.provider) {
                Ok(groups) => input_groups.extend(groups),
                Err(err) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.increment_connection_failures();
                    }
                    log_event(
                        Event::ConnectionAcquireFailed,
                        &[
                            ("execution_id", &execution_id.to_string()),
                            ("data_source", data_source),
                            ("code", err.code()),
                            ("error", &err.to_string()),
                        ],
                    );
                    return Err(err);
                }
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.add_groups_prepared(input_groups.len());
        }
        let prepared = ExecutionGroupContext {
            execution_id,
            input_groups,
        };
        log_event(
            Event::PrepareComplete,
            &[
                ("execution_id", &execution_id.to_string()),
                ("groups", &prepared.input_groups.len().to_string()),
                ("units", &prepared.unit_count().to_string()),
                ("elapsed_us", &started.elapsed().as_micros().to_string()),
            ],
        );
        Ok(prepared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        next: AtomicUsize,
        fail_on: Option<&'static str>,
        short_by: usize,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                next: AtomicUsize::new(0),
                fail_on: None,
                short_by: 0,
            }
        }
    }

    impl ConnectionProvider for CountingProvider {
        type Connection = usize;

        fn get_connections(
            &self,
            _mode: ConnectionMode,
            data_source_name: &str,
            count: usize,
        ) -> Result<Vec<usize>, StorageError> {
            if self.fail_on == Some(data_source_name) {
                return Err(StorageError::new(data_source_name, "pool exhausted"));
            }
            Ok((0..count.saturating_sub(self.short_by))
                .map(|_| self.next.fetch_add(1, Ordering::SeqCst))
                .collect())
        }
    }

    fn units(n: usize) -> Vec<SqlUnit> {
        (0..n).map(|i| SqlUnit::new(format!("SELECT {}", i))).collect()
    }

    #[test]
    fn test_partition_size() {
        assert_eq!(partition_size(10, 3), 4);
        assert_eq!(partition_size(2, 8), 1);
        assert_eq!(partition_size(0, 2), 1);
        assert_eq!(partition_size(5, 0), 5);
    }

    #[test]
    fn test_partition_bounds() {
        let provider = CountingProvider::new();
        for n in 1..12 {
            for m in 1..6 {
                let groups = partition("ds_0", units(n), m, &provider).unwrap();
                assert!(groups.len() <= m.min(n), "n={} m={} groups={}", n, m, groups.len());
                assert_eq!(groups.iter().map(InputGroup::len).sum::<usize>(), n);
            }
        }
    }

    #[test]
    fn test_units_share_group_connection_in_order() {
        let provider = CountingProvider::new();
        let groups = partition("ds_0", units(5), 2, &provider).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 3);
        assert!(groups[0].inputs.iter().all(|u| u.connection == groups[0].inputs[0].connection));
        assert_ne!(groups[0].inputs[0].connection, groups[1].inputs[0].connection);
        assert_eq!(groups[1].inputs[1].execution_unit.sql_unit.sql, "SELECT 4");
        assert_eq!(groups[0].inputs[0].connection_mode, ConnectionMode::MemoryStrictly);
    }

    #[test]
    fn test_connection_failure_propagates() {
        let provider = CountingProvider {
            fail_on: Some("ds_1"),
            ..CountingProvider::new()
        };
        let err = partition("ds_1", units(2), 2, &provider).unwrap_err();
        assert_eq!(err.code(), "SHARD_EXEC_CONNECTION_ACQUIRE");
    }

    #[test]
    fn test_short_provider_rejected() {
        let provider = CountingProvider {
            short_by: 1,
            ..CountingProvider::new()
        };
        let err = partition("ds_0", units(4), 4, &provider).unwrap_err();
        assert_eq!(
            err,
            ExecutionError::InsufficientConnections {
                data_source: "ds_0".into(),
                requested: 4,
                acquired: 3,
            }
        );
    }

    #[test]
    fn test_prepare_groups_by_data_source() {
        use crate::route::{RouteContext, RouteMapper, RouteUnit};

        let route: RouteContext = ["ds_0", "ds_1", "ds_0"]
            .iter()
            .enumerate()
            .map(|(i, ds)| {
                RouteUnit::new(
                    RouteMapper::identity(*ds),
                    vec![RouteMapper::new("t", format!("t_{}", i))],
                )
            })
            .collect();
        let rewriter = |unit: &RouteUnit| vec![SqlUnit::new(format!("DELETE FROM {}", unit.table_mappers[0].actual_name))];
        let context = ExecutionContext::build(route, &rewriter);

        let provider = CountingProvider::new();
        let metrics = Arc::new(MetricsRegistry::new());
        let prepared = ExecutionPrepareEngine::new(&provider, 1)
            .with_metrics(Arc::clone(&metrics))
            .prepare(&context)
            .unwrap();
        assert_eq!(prepared.input_groups.len(), 2);
        assert_eq!(prepared.unit_count(), 3);
        let first = &prepared.input_groups[0].inputs;
        assert_eq!(first[0].execution_unit.data_source_name, "ds_0");
        assert_eq!(first[1].execution_unit.sql_unit.sql, "DELETE FROM t_2");
        assert_eq!(metrics.snapshot().groups_prepared, 2);
    }

    #[test]
    fn test_prepare_counts_connection_failures() {
        use crate::route::{RouteContext, RouteMapper, RouteUnit};

        let route: RouteContext =
            std::iter::once(RouteUnit::new(RouteMapper::identity("ds_1"), Vec::new())).collect();
        let context = ExecutionContext::build(route, &|_: &RouteUnit| vec![SqlUnit::new("SELECT 1")]);
        let provider = CountingProvider {
            fail_on: Some("ds_1"),
            ..CountingProvider::new()
        };
        let metrics = Arc::new(MetricsRegistry::new());
        let err = ExecutionPrepareEngine::new(&provider, 1)
            .with_metrics(Arc::clone(&metrics))
            .prepare(&context)
            .unwrap_err();
        assert!(err.is_resource());
        assert_eq!(metrics.snapshot().connection_failures, 1);
    }

    #[test]
    fn test_prepare_engine_from_config() {
        let provider = CountingProvider::new();
        let config = ExecutorConfig {
            max_connections_size_per_query: 0,
            ..Default::default()
        };
        let err = ExecutionPrepareEngine::from_config(&provider, &config).err();
        assert_eq!(err.map(|e| e.code()), Some("SHARD_EXEC_INVALID_CONFIG"));

        let config = ExecutorConfig {
            max_connections_size_per_query: 2,
            ..Default::default()
        };
        let engine = ExecutionPrepareEngine::from_config(&provider, &config).unwrap();
        assert_eq!(engine.max_connections_size_per_query, 2);
    }
}
