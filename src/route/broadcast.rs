//! Broadcast routing
//!
//! - Database broadcast: one unit per known data source, tables mapped
//!   identity-wise.
//! - Table broadcast: every actual data node of each sharding table, and
//!   every data source for broadcast tables.

use crate::rule::ShardingRule;

use super::context::{RouteContext, RouteMapper, RouteUnit};
use super::errors::{RouteError, RouteResult};

pub(crate) fn route_database_broadcast(rule: &ShardingRule, tables: &[String]) -> RouteContext {
    rule.data_source_names()
        .iter()
        .map(|ds| {
            RouteUnit::new(
                RouteMapper::identity(ds.as_str()),
                tables.iter().map(|t| RouteMapper::identity(t.as_str())).collect(),
            )
        })
        .collect()
}

pub(crate) fn route_table_broadcast(rule: &ShardingRule, tables: &[String]) -> RouteResult<RouteContext> {
    if tables.is_empty() {
        return Ok(route_database_broadcast(rule, tables));
    }
    let mut context = RouteContext::new();
    for table in tables {
        if let Some(table_rule) = rule.find_table_rule(table) {
            for node in &table_rule.actual_data_nodes {
                context.add_route_unit(RouteUnit::new(
                    RouteMapper::identity(node.data_source_name.as_str()),
                    vec![RouteMapper::new(table.as_str(), node.table_name.as_str())],
                ));
            }
        } else if rule.is_broadcast_table(table) {
            for ds in rule.data_source_names() {
                context.add_route_unit(RouteUnit::new(
                    RouteMapper::identity(ds.as_str()),
                    vec![RouteMapper::identity(table.as_str())],
                ));
            }
        } else {
            return Err(RouteError::TableRuleNotFound(table.clone()));
        }
    }
    Ok(context)
}
