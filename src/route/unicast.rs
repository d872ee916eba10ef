//! Unicast routing
//!
//! Picks exactly one target for statements that need no sharding-column
//! evaluation. Where several data sources are equally valid one is chosen
//! uniformly at random; the choice is never outside the valid set.

use rand::seq::SliceRandom;

use crate::rule::ShardingRule;

use super::context::{RouteContext, RouteMapper, RouteUnit};
use super::errors::{RouteError, RouteResult};

pub(crate) fn route(rule: &ShardingRule, tables: &[String]) -> RouteResult<RouteContext> {
    let unit = if tables.is_empty() {
        RouteUnit::new(RouteMapper::identity(random_data_source(rule.data_source_names())?), Vec::new())
    } else if rule.is_all_broadcast_tables(tables) {
        RouteUnit::new(
            RouteMapper::identity(random_data_source(rule.data_source_names())?),
            tables.iter().map(|t| RouteMapper::identity(t.as_str())).collect(),
        )
    } else if tables.len() == 1 {
        route_single_table(rule, &tables[0])?
    } else {
        route_common_data_source(rule, tables)?
    };
    Ok(std::iter::once(unit).collect())
}

fn route_single_table(rule: &ShardingRule, logic_table: &str) -> RouteResult<RouteUnit> {
    if rule.find_table_rule(logic_table).is_none() {
        // No rule: leave the table for the storage layer to resolve.
        return Ok(RouteUnit::new(
            RouteMapper::identity(random_data_source(rule.data_source_names())?),
            vec![RouteMapper::identity(logic_table)],
        ));
    }
    let node = rule.data_node(logic_table)?;
    Ok(RouteUnit::new(
        RouteMapper::identity(node.data_source_name),
        vec![RouteMapper::new(logic_table, node.table_name)],
    ))
}

fn route_common_data_source(rule: &ShardingRule, tables: &[String]) -> RouteResult<RouteUnit> {
    let mut candidates: Vec<String> = rule.data_source_names().to_vec();
    for table in tables {
        match rule.find_table_rule(table) {
            Some(table_rule) => {
                let spanned = table_rule.actual_data_source_names();
                candidates.retain(|ds| spanned.contains(ds));
            }
            None if rule.is_broadcast_table(table) => {}
            None => return Err(RouteError::TableRuleNotFound(table.clone())),
        }
    }
    let data_source = candidates
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or_else(|| RouteError::NoCommonDataSource(tables.to_vec()))?;

    let mut table_mappers = Vec::with_capacity(tables.len());
    for table in tables {
        let actual = match rule.find_table_rule(table) {
            Some(table_rule) => table_rule
                .first_actual_table(&data_source)
                .ok_or_else(|| RouteError::NoCommonDataSource(tables.to_vec()))?
                .to_string(),
            None => table.clone(),
        };
        table_mappers.push(RouteMapper::new(table.as_str(), actual));
    }
    Ok(RouteUnit::new(RouteMapper::identity(data_source), table_mappers))
}

fn random_data_source(names: &[String]) -> RouteResult<String> {
    names
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or_else(|| RouteError::NoRouteTargets("<no data source>".to_string()))
}
