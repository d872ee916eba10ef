//! Cartesian routing
//!
//! Statements over several sharded tables that are not bound together. Each
//! table is routed on its own; the results are combined on every data source
//! they share, pairing each actual table of one with each actual table of the
//! others. Tables bound to an already routed table ride along with it.

use crate::rule::ShardingRule;

use super::context::{RouteContext, RouteMapper, RouteUnit};
use super::errors::{RouteError, RouteResult};
use super::shape::{HintContext, ShardingTarget};
use super::standard;

pub(crate) fn route(rule: &ShardingRule, targets: &[ShardingTarget], hint: &HintContext) -> RouteResult<RouteContext> {
    let mut covered: Vec<&str> = Vec::new();
    let mut contexts: Vec<RouteContext> = Vec::new();
    for target in targets {
        let logic_table = target.logic_table.as_str();
        if covered
            .iter()
            .any(|t| t.eq_ignore_ascii_case(logic_table) || rule.is_all_binding_tables(&[*t, logic_table]))
        {
            continue;
        }
        contexts.push(standard::route_any(rule, target, hint)?);
        covered.extend(target.tables());
    }

    if contexts.len() <= 1 {
        return contexts
            .pop()
            .ok_or_else(|| RouteError::NoRouteTargets("<no table>".to_string()));
    }

    let data_sources = common_data_sources(&contexts);
    if data_sources.is_empty() {
        return Err(RouteError::NoCommonDataSource(
            covered.iter().map(|t| t.to_string()).collect(),
        ));
    }

    let mut result = RouteContext::new();
    for data_source in data_sources {
        let mut combinations: Vec<Vec<RouteMapper>> = vec![Vec::new()];
        for context in &contexts {
            let choices: Vec<&[RouteMapper]> = context
                .route_units()
                .iter()
                .filter(|u| u.data_source_name() == data_source)
                .map(|u| u.table_mappers.as_slice())
                .collect();
            combinations = combinations
                .iter()
                .flat_map(|prefix| {
                    choices.iter().map(move |mappers| {
                        let mut combined = prefix.clone();
                        combined.extend_from_slice(mappers);
                        combined
                    })
                })
                .collect();
        }
        for table_mappers in combinations {
            result.add_route_unit(RouteUnit::new(RouteMapper::identity(data_source.as_str()), table_mappers));
        }
    }
    Ok(result)
}

/// Data sources present in every context, in first-context order.
fn common_data_sources(contexts: &[RouteContext]) -> Vec<String> {
    let Some((first, rest)) = contexts.split_first() else {
        return Vec::new();
    };
    first
        .actual_data_source_names()
        .into_iter()
        .filter(|ds| rest.iter().all(|c| c.find_route_unit(ds).is_some()))
        .map(str::to_string)
        .collect()
}
