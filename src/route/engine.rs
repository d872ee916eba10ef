//! Routing engine
//!
//! Borrows a [`ShardingRule`] for the duration of a call and never mutates
//! it. A hint data source takes precedence over every statement shape.

use std::time::Instant;

use crate::observability::{log_event, Event, MetricsRegistry};
use crate::rule::{ShardingRule, StrategyKind};

use super::context::{RouteContext, RouteMapper, RouteUnit};
use super::errors::{RouteError, RouteResult};
use super::shape::{HintContext, StatementShape};
use super::{broadcast, cartesian, standard, unicast};

/// Computes route contexts from statement shapes.
pub struct RoutingEngine<'a> {
    rule: &'a ShardingRule,
    metrics: Option<&'a MetricsRegistry>,
}

impl<'a> RoutingEngine<'a> {
    pub fn new(rule: &'a ShardingRule) -> Self {
        Self { rule, metrics: None }
    }

    /// Count routes and route failures into `metrics`.
    pub fn with_metrics(mut self, metrics: &'a MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Route one statement.
    pub fn route(&self, shape: &StatementShape, hint: &HintContext) -> RouteResult<RouteContext> {
        let started = Instant::now();
        let result = self.dispatch(shape, hint);
        let elapsed_us = started.elapsed().as_micros().to_string();
        match &result {
            Ok(context) => {
                if let Some(metrics) = self.metrics {
                    metrics.record_route(context.len());
                }
                log_event(
                    Event::RouteComplete,
                    &[
                        ("shape", shape.name()),
                        ("route_units", &context.len().to_string()),
                        ("data_sources", &context.actual_data_source_names().join(",")),
                        ("elapsed_us", &elapsed_us),
                    ],
                );
            }
            Err(err) => {
                if let Some(metrics) = self.metrics {
                    metrics.increment_route_failures();
                }
                log_event(
                    Event::RouteFailed,
                    &[
                        ("shape", shape.name()),
                        ("code", err.code()),
                        ("error", &err.to_string()),
                    ],
                );
            }
        }
        result
    }

    fn dispatch(&self, shape: &StatementShape, hint: &HintContext) -> RouteResult<RouteContext> {
        if let Some(data_source) = hint.find_hint_data_source_name() {
            return self.route_hint(data_source, &shape.tables());
        }
        match shape {
            StatementShape::Standard(target) => standard::route(self.rule, target, hint, StrategyKind::Standard),
            StatementShape::Complex(target) => standard::route(self.rule, target, hint, StrategyKind::Complex),
            StatementShape::Unicast { tables } => unicast::route(self.rule, tables),
            StatementShape::Broadcast { tables } => Ok(broadcast::route_database_broadcast(self.rule, tables)),
            StatementShape::TableBroadcast { tables } => broadcast::route_table_broadcast(self.rule, tables),
            StatementShape::Join(targets) => cartesian::route(self.rule, targets, hint),
        }
    }

    fn route_hint(&self, data_source: &str, tables: &[&str]) -> RouteResult<RouteContext> {
        if !self.rule.contains_data_source(data_source) {
            return Err(RouteError::HintDataSourceNotExists(data_source.to_string()));
        }
        let unit = RouteUnit::new(
            RouteMapper::identity(data_source),
            tables.iter().map(|t| RouteMapper::identity(*t)).collect(),
        );
        Ok(std::iter::once(unit).collect())
    }
}
