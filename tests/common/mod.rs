//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use aeroshard::executor::{ConnectionMode, ConnectionProvider, StorageError};
use aeroshard::route::{ShardingCondition, ShardingTarget, StatementShape};
use aeroshard::rule::{ShardingRule, ShardingRuleConfig};

/// `t_order` split even/odd by `order_id` over `ds_0`/`ds_1`, two tables
/// per data source; `t_order_item` bound to it; `t_user` split by `user_id`
/// on both levels and not bound; `t_config` broadcast.
pub const ORDER_RULE_JSON: &str = r#"{
    "data_sources": ["ds_0", "ds_1"],
    "tables": [
        {
            "logic_table": "t_order",
            "actual_data_nodes": "ds_${0..1}.t_order_${0..1}",
            "database_strategy": {"standard": {"sharding_column": "order_id", "algorithm_name": "ds_inline"}},
            "table_strategy": {"standard": {"sharding_column": "user_id", "algorithm_name": "t_order_inline"}}
        },
        {
            "logic_table": "t_order_item",
            "actual_data_nodes": "ds_${0..1}.t_order_item_${0..1}",
            "database_strategy": {"standard": {"sharding_column": "order_id", "algorithm_name": "ds_inline"}},
            "table_strategy": {"standard": {"sharding_column": "user_id", "algorithm_name": "t_order_item_inline"}}
        },
        {
            "logic_table": "t_user",
            "actual_data_nodes": "ds_${0..1}.t_user_${0..1}",
            "database_strategy": {"standard": {"sharding_column": "user_id", "algorithm_name": "ds_user_inline"}},
            "table_strategy": {"standard": {"sharding_column": "user_id", "algorithm_name": "t_user_inline"}}
        }
    ],
    "binding_tables": ["t_order,t_order_item"],
    "broadcast_tables": ["t_config"],
    "sharding_algorithms": {
        "ds_inline": {"type": "INLINE", "props": {"algorithm-expression": "ds_${order_id % 2}"}},
        "t_order_inline": {"type": "INLINE", "props": {"algorithm-expression": "t_order_${user_id % 2}"}},
        "t_order_item_inline": {"type": "INLINE", "props": {"algorithm-expression": "t_order_item_${user_id % 2}"}},
        "ds_user_inline": {"type": "INLINE", "props": {"algorithm-expression": "ds_${user_id % 2}"}},
        "t_user_inline": {"type": "INLINE", "props": {"algorithm-expression": "t_user_${user_id % 2}"}}
    }
}"#;

pub fn order_rule() -> ShardingRule {
    ShardingRule::new(ShardingRuleConfig::from_json_str(ORDER_RULE_JSON).unwrap()).unwrap()
}

/// Two unsharded tables spanning `{ds_0, ds_1}` and `{ds_1, ds_2}`.
pub fn overlapping_rule() -> ShardingRule {
    let json = r#"{
        "data_sources": ["ds_0", "ds_1", "ds_2"],
        "tables": [
            {"logic_table": "t_left", "actual_data_nodes": "ds_${0..1}.t_left"},
            {"logic_table": "t_right", "actual_data_nodes": "ds_${1..2}.t_right"}
        ]
    }"#;
    ShardingRule::new(ShardingRuleConfig::from_json_str(json).unwrap()).unwrap()
}

/// `WHERE order_id IN (ids)` on `t_order`
pub fn orders_by_id(ids: &[i64]) -> StatementShape {
    StatementShape::Standard(
        ShardingTarget::new("t_order")
            .with_condition(ShardingCondition::new().equal("t_order", "order_id", ids.iter().copied())),
    )
}

/// `WHERE user_id = id` on `t_user`
pub fn user_by_id(id: i64) -> ShardingTarget {
    ShardingTarget::new("t_user").with_condition(ShardingCondition::new().equal("t_user", "user_id", [id]))
}

/// Hands out a fresh integer handle per connection.
#[derive(Default)]
pub struct SequentialProvider {
    next: AtomicUsize,
}

impl ConnectionProvider for SequentialProvider {
    type Connection = usize;

    fn get_connections(
        &self,
        _mode: ConnectionMode,
        _data_source_name: &str,
        count: usize,
    ) -> Result<Vec<usize>, StorageError> {
        Ok((0..count).map(|_| self.next.fetch_add(1, Ordering::SeqCst)).collect())
    }
}
