//! Standard and complex routing
//!
//! Two levels per condition: the database strategy narrows the table's data
//! sources, then the table strategy narrows the actual tables on each chosen
//! data source. Conditions are OR-ed, so their data nodes are unioned.
//! Binding tables ride along on every unit, mapped by actual-table position.

use crate::rule::{
    DataNode, RuleError, ShardingConditionValue, ShardingRule, ShardingStrategy, StrategyKind, TableRule,
};

use super::context::{RouteContext, RouteMapper, RouteUnit};
use super::errors::{RouteError, RouteResult};
use super::shape::{HintContext, ShardingTarget};

/// Route a sharding target whose shape requires `expected` strategies.
pub(crate) fn route(
    rule: &ShardingRule,
    target: &ShardingTarget,
    hint: &HintContext,
    expected: StrategyKind,
) -> RouteResult<RouteContext> {
    route_target(rule, target, hint, Some(expected))
}

/// Route a sharding target with whatever strategies its table carries.
pub(crate) fn route_any(rule: &ShardingRule, target: &ShardingTarget, hint: &HintContext) -> RouteResult<RouteContext> {
    route_target(rule, target, hint, None)
}

fn route_target(
    rule: &ShardingRule,
    target: &ShardingTarget,
    hint: &HintContext,
    expected: Option<StrategyKind>,
) -> RouteResult<RouteContext> {
    let logic_table = target.logic_table.as_str();
    let table_rule = rule
        .find_table_rule(logic_table)
        .ok_or_else(|| RouteError::TableRuleNotFound(logic_table.to_string()))?;
    let database_strategy = rule.database_strategy(table_rule);
    let table_strategy = rule.table_strategy(table_rule);
    if let Some(expected) = expected {
        check_strategy(logic_table, database_strategy, expected)?;
        check_strategy(logic_table, table_strategy, expected)?;
    }

    if !target.binding_tables.is_empty() && !rule.is_all_binding_tables(&target.tables()) {
        return Err(RuleError::InvalidConfig(format!(
            "tables {} are not bound together",
            target.tables().join(",")
        ))
        .into());
    }

    let levels = Levels {
        logic_table,
        table_rule,
        database_strategy,
        table_strategy,
        hint,
    };
    let mut nodes: Vec<DataNode> = Vec::new();
    if target.conditions.is_empty() {
        levels.route_into(&[], &mut nodes)?;
    } else {
        for condition in &target.conditions {
            levels.route_into(&condition.values_for(logic_table), &mut nodes)?;
        }
    }
    if nodes.is_empty() {
        return Err(RouteError::NoRouteTargets(logic_table.to_string()));
    }

    let mut context = RouteContext::new();
    for node in nodes {
        let mut table_mappers = Vec::with_capacity(1 + target.binding_tables.len());
        table_mappers.push(RouteMapper::new(logic_table, node.table_name.as_str()));
        for binding in &target.binding_tables {
            let actual =
                rule.binding_actual_table(&node.data_source_name, logic_table, binding, &node.table_name)?;
            table_mappers.push(RouteMapper::new(binding.as_str(), actual));
        }
        context.add_route_unit(RouteUnit::new(
            RouteMapper::identity(node.data_source_name),
            table_mappers,
        ));
    }
    Ok(context)
}

fn check_strategy(table: &str, strategy: &ShardingStrategy, expected: StrategyKind) -> RouteResult<()> {
    let actual = strategy.kind();
    let conflicting = match expected {
        StrategyKind::Standard => actual == StrategyKind::Complex,
        StrategyKind::Complex => actual == StrategyKind::Standard,
        StrategyKind::Hint | StrategyKind::None => false,
    };
    if conflicting {
        return Err(RouteError::StrategyMismatch {
            table: table.to_string(),
            expected: expected.as_str(),
            actual: actual.as_str(),
        });
    }
    Ok(())
}

struct Levels<'r> {
    logic_table: &'r str,
    table_rule: &'r TableRule,
    database_strategy: &'r ShardingStrategy,
    table_strategy: &'r ShardingStrategy,
    hint: &'r HintContext,
}

impl Levels<'_> {
    fn route_into(&self, values: &[&ShardingConditionValue], nodes: &mut Vec<DataNode>) -> RouteResult<()> {
        let available_sources = self.table_rule.actual_data_source_names();
        let data_sources = self.narrow(
            self.database_strategy,
            &available_sources,
            values,
            self.hint.database_sharding_values(self.logic_table),
        )?;
        for data_source in data_sources {
            let available_tables = self.table_rule.actual_table_names(&data_source);
            let tables = self.narrow(
                self.table_strategy,
                &available_tables,
                values,
                self.hint.table_sharding_values(self.logic_table),
            )?;
            for table in tables {
                let node = DataNode::new(data_source.as_str(), table);
                if !nodes.contains(&node) {
                    nodes.push(node);
                }
            }
        }
        Ok(())
    }

    fn narrow(
        &self,
        strategy: &ShardingStrategy,
        available: &[String],
        values: &[&ShardingConditionValue],
        hint_values: &[crate::rule::ShardingValue],
    ) -> RouteResult<Vec<String>> {
        let targets = match strategy.kind() {
            StrategyKind::Hint => strategy.do_hint_sharding(available, hint_values)?,
            _ => strategy.do_sharding(available, values)?,
        };
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::route::shape::ShardingCondition;
    use crate::rule::{AlgorithmConfig, RangeValue, ShardingRuleConfig, StrategyConfig, TableRuleConfig};

    fn rule() -> ShardingRule {
        let mut order = TableRuleConfig::new("t_order", "ds_${0..1}.t_order_${0..1}");
        order.database_strategy = Some(StrategyConfig::standard("user_id", "db_inline"));
        order.table_strategy = Some(StrategyConfig::standard("order_id", "order_inline"));
        let mut item = TableRuleConfig::new("t_order_item", "ds_${0..1}.t_order_item_${0..1}");
        item.database_strategy = Some(StrategyConfig::standard("user_id", "db_inline"));
        item.table_strategy = Some(StrategyConfig::standard("order_id", "item_inline"));
        let mut multi = TableRuleConfig::new("t_multi", "ds_${0..1}.t_multi_${0..1}");
        multi.table_strategy = Some(StrategyConfig::complex("user_id,order_id", "multi_complex"));
        let mut hinted = TableRuleConfig::new("t_hint", "ds_${0..1}.t_hint");
        hinted.database_strategy = Some(StrategyConfig::hint("db_hint"));
        ShardingRule::new(ShardingRuleConfig {
            data_sources: vec!["ds_0".into(), "ds_1".into()],
            tables: vec![order, item, multi, hinted],
            binding_tables: vec!["t_order,t_order_item".into()],
            broadcast_tables: vec![],
            sharding_algorithms: BTreeMap::from([
                (
                    "db_inline".to_string(),
                    AlgorithmConfig::new("INLINE").with_prop("algorithm-expression", "ds_${user_id % 2}"),
                ),
                (
                    "order_inline".to_string(),
                    AlgorithmConfig::new("INLINE").with_prop("algorithm-expression", "t_order_${order_id % 2}"),
                ),
                (
                    "item_inline".to_string(),
                    AlgorithmConfig::new("INLINE")
                        .with_prop("algorithm-expression", "t_order_item_${order_id % 2}"),
                ),
                (
                    "multi_complex".to_string(),
                    AlgorithmConfig::new("COMPLEX_INLINE")
                        .with_prop("algorithm-expression", "t_multi_${order_id % 2}"),
                ),
                (
                    "db_hint".to_string(),
                    AlgorithmConfig::new("INLINE").with_prop("algorithm-expression", "ds_${value % 2}"),
                ),
            ]),
            default_database_strategy: None,
            default_table_strategy: None,
        })
        .unwrap()
    }

    fn targets(context: &RouteContext) -> Vec<String> {
        context
            .route_units()
            .iter()
            .map(|u| format!("{}.{}", u.data_source_name(), u.table_mappers[0].actual_name))
            .collect()
    }

    #[test]
    fn test_precise_both_levels() {
        let target = ShardingTarget::new("t_order").with_condition(
            ShardingCondition::new()
                .equal("t_order", "user_id", [1i64])
                .equal("t_order", "order_id", [10i64]),
        );
        let context = route(&rule(), &target, &HintContext::new(), StrategyKind::Standard).unwrap();
        assert_eq!(targets(&context), vec!["ds_1.t_order_0"]);
    }

    #[test]
    fn test_no_conditions_fans_out() {
        let target = ShardingTarget::new("t_order");
        let context = route(&rule(), &target, &HintContext::new(), StrategyKind::Standard).unwrap();
        assert_eq!(
            targets(&context),
            vec!["ds_0.t_order_0", "ds_0.t_order_1", "ds_1.t_order_0", "ds_1.t_order_1"]
        );
    }

    #[test]
    fn test_or_conditions_union() {
        let target = ShardingTarget::new("t_order")
            .with_condition(ShardingCondition::new().equal("t_order", "order_id", [2i64]))
            .with_condition(ShardingCondition::new().range("t_order", "order_id", RangeValue::closed(3, 3)));
        let context = route(&rule(), &target, &HintContext::new(), StrategyKind::Standard).unwrap();
        assert_eq!(
            targets(&context),
            vec!["ds_0.t_order_0", "ds_1.t_order_0", "ds_0.t_order_1", "ds_1.t_order_1"]
        );
    }

    #[test]
    fn test_binding_tables_follow_primary() {
        let target = ShardingTarget::new("t_order")
            .with_binding_table("t_order_item")
            .with_condition(
                ShardingCondition::new()
                    .equal("t_order", "user_id", [0i64])
                    .equal("t_order", "order_id", [1i64]),
            );
        let context = route(&rule(), &target, &HintContext::new(), StrategyKind::Standard).unwrap();
        let unit = &context.route_units()[0];
        assert_eq!(context.len(), 1);
        assert_eq!(unit.data_source_name(), "ds_0");
        assert_eq!(unit.find_table_mapper("t_order_item").unwrap().actual_name, "t_order_item_1");
    }

    #[test]
    fn test_unbound_tables_rejected() {
        let target = ShardingTarget::new("t_order").with_binding_table("t_multi");
        let err = route(&rule(), &target, &HintContext::new(), StrategyKind::Standard).unwrap_err();
        assert_eq!(err.code(), "SHARD_RULE_INVALID_CONFIG");
    }

    #[test]
    fn test_strategy_mismatch() {
        let err = route(
            &rule(),
            &ShardingTarget::new("t_multi"),
            &HintContext::new(),
            StrategyKind::Standard,
        )
        .unwrap_err();
        assert!(matches!(err, RouteError::StrategyMismatch { .. }));

        let err = route(
            &rule(),
            &ShardingTarget::new("t_order"),
            &HintContext::new(),
            StrategyKind::Complex,
        )
        .unwrap_err();
        assert_eq!(err.code(), "SHARD_ROUTE_STRATEGY_MISMATCH");
    }

    #[test]
    fn test_hint_strategy_values() {
        let hint = HintContext::new().add_database_value("t_hint", 3i64);
        let context = route(&rule(), &ShardingTarget::new("t_hint"), &hint, StrategyKind::Standard).unwrap();
        assert_eq!(targets(&context), vec!["ds_1.t_hint"]);

        let context = route(
            &rule(),
            &ShardingTarget::new("t_hint"),
            &HintContext::new(),
            StrategyKind::Standard,
        )
        .unwrap();
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn test_route_any_accepts_either_strategy_kind() {
        let context = route_any(&rule(), &ShardingTarget::new("t_multi"), &HintContext::new()).unwrap();
        assert_eq!(context.len(), 4);
        let context = route_any(&rule(), &ShardingTarget::new("t_order"), &HintContext::new()).unwrap();
        assert_eq!(context.len(), 4);
    }

    #[test]
    fn test_unknown_table() {
        let err = route(
            &rule(),
            &ShardingTarget::new("t_user"),
            &HintContext::new(),
            StrategyKind::Standard,
        )
        .unwrap_err();
        assert_eq!(err, RouteError::TableRuleNotFound("t_user".into()));
        assert!(err.is_no_match());
    }

    #[test]
    fn test_empty_range_is_no_route_targets() {
        let target = ShardingTarget::new("t_order").with_condition(ShardingCondition::new().range(
            "t_order",
            "order_id",
            RangeValue::closed(5, 1),
        ));
        let err = route(&rule(), &target, &HintContext::new(), StrategyKind::Standard).unwrap_err();
        assert_eq!(err, RouteError::NoRouteTargets("t_order".into()));
    }
}
