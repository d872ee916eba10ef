//! Rule model
//!
//! Sharding configuration compiled into lookups the routing engine borrows:
//!
//! - Table rules: logic table to actual data nodes, plus strategies
//! - Broadcast tables replicated on every data source
//! - Binding groups of tables sharing one node layout
//! - Built-in algorithms (`INLINE`, `MOD`, `COMPLEX_INLINE`)
//!
//! A [`ShardingRule`] is immutable after [`ShardingRule::new`] and is shared
//! read-only across routing calls.

mod algorithm;
mod config;
mod data_node;
mod errors;
mod inline;
mod sharding_rule;
mod strategy;
mod table_rule;

pub use algorithm::{
    ColumnValues, ComplexInlineShardingAlgorithm, ComplexShardingAlgorithm, ComplexShardingValues,
    InlineShardingAlgorithm, ModShardingAlgorithm, RangeBound, RangeValue, ShardingAlgorithm,
    ShardingValue, StandardShardingAlgorithm,
};
pub use config::{AlgorithmConfig, ShardingRuleConfig, StrategyConfig, TableRuleConfig};
pub use data_node::DataNode;
pub use errors::{RuleError, RuleResult};
pub use inline::{expand_data_nodes, AlgorithmExpression};
pub use sharding_rule::ShardingRule;
pub use strategy::{ShardingConditionValue, ShardingStrategy, StrategyKind};
pub use table_rule::TableRule;
