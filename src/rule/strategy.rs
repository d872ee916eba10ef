//! Sharding strategies
//!
//! A strategy binds sharding columns to an algorithm and narrows a list of
//! available targets using the predicates the statement supplies. With no
//! usable predicate every available target stays in (fan-out).

use std::sync::Arc;

use super::algorithm::{
    ColumnValues, ComplexShardingAlgorithm, ComplexShardingValues, ShardingValue,
    StandardShardingAlgorithm,
};
use super::errors::RuleResult;

/// Strategy kind, as seen by routing shape checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Standard,
    Complex,
    Hint,
    None,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Standard => "standard",
            StrategyKind::Complex => "complex",
            StrategyKind::Hint => "hint",
            StrategyKind::None => "none",
        }
    }
}

/// One column predicate, as handed to a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardingConditionValue {
    /// Logic table the column belongs to
    pub table: String,
    pub column: String,
    pub values: ColumnValues,
}

impl ShardingConditionValue {
    /// `column IN (values)` on `table`
    pub fn equal(
        table: impl Into<String>,
        column: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<ShardingValue>>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            values: ColumnValues::In(values.into_iter().map(Into::into).collect()),
        }
    }

    /// `column` within `range` on `table`
    pub fn range(
        table: impl Into<String>,
        column: impl Into<String>,
        range: super::algorithm::RangeValue,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            values: ColumnValues::Range(range),
        }
    }
}

/// A compiled sharding strategy
#[derive(Debug, Clone)]
pub enum ShardingStrategy {
    /// Single sharding column
    Standard {
        column: String,
        algorithm: Arc<dyn StandardShardingAlgorithm>,
    },
    /// Several sharding columns, evaluated as one tuple
    Complex {
        columns: Vec<String>,
        algorithm: Arc<dyn ComplexShardingAlgorithm>,
    },
    /// Values come from the hint context instead of predicates
    Hint {
        algorithm: Arc<dyn StandardShardingAlgorithm>,
    },
    /// Not sharded on this level
    None,
}

impl ShardingStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            ShardingStrategy::Standard { .. } => StrategyKind::Standard,
            ShardingStrategy::Complex { .. } => StrategyKind::Complex,
            ShardingStrategy::Hint { .. } => StrategyKind::Hint,
            ShardingStrategy::None => StrategyKind::None,
        }
    }

    /// Columns this strategy shards on
    pub fn sharding_columns(&self) -> Vec<&str> {
        match self {
            ShardingStrategy::Standard { column, .. } => vec![column.as_str()],
            ShardingStrategy::Complex { columns, .. } => columns.iter().map(String::as_str).collect(),
            ShardingStrategy::Hint { .. } | ShardingStrategy::None => Vec::new(),
        }
    }

    /// Narrow `available_targets` using predicate values.
    ///
    /// Hint strategies ignore predicates; use [`ShardingStrategy::do_hint_sharding`].
    pub fn do_sharding(
        &self,
        available_targets: &[String],
        condition_values: &[&ShardingConditionValue],
    ) -> RuleResult<Vec<String>> {
        match self {
            ShardingStrategy::None | ShardingStrategy::Hint { .. } => Ok(available_targets.to_vec()),
            ShardingStrategy::Standard { column, algorithm } => {
                let found = condition_values
                    .iter()
                    .find(|c| c.column.eq_ignore_ascii_case(column));
                match found {
                    None => Ok(available_targets.to_vec()),
                    Some(condition) => match &condition.values {
                        ColumnValues::In(values) => {
                            let mut targets = Vec::new();
                            for value in values {
                                let target = algorithm.do_precise(available_targets, value)?;
                                if !targets.contains(&target) {
                                    targets.push(target);
                                }
                            }
                            Ok(targets)
                        }
                        ColumnValues::Range(range) => algorithm.do_range(available_targets, range),
                    },
                }
            }
            ShardingStrategy::Complex { columns, algorithm } => {
                let mut values = ComplexShardingValues::default();
                for condition in condition_values {
                    let Some(column) = columns.iter().find(|c| c.eq_ignore_ascii_case(&condition.column))
                    else {
                        continue;
                    };
                    match &condition.values {
                        ColumnValues::In(list) => {
                            values.column_values.insert(column.clone(), list.clone());
                        }
                        ColumnValues::Range(range) => {
                            values.column_ranges.insert(column.clone(), range.clone());
                        }
                    }
                }
                if values.column_values.is_empty() && values.column_ranges.is_empty() {
                    return Ok(available_targets.to_vec());
                }
                algorithm.do_sharding(available_targets, &values)
            }
        }
    }

    /// Narrow `available_targets` using hint values; no values means fan-out.
    pub fn do_hint_sharding(
        &self,
        available_targets: &[String],
        hint_values: &[ShardingValue],
    ) -> RuleResult<Vec<String>> {
        match self {
            ShardingStrategy::Hint { algorithm } if !hint_values.is_empty() => {
                let mut targets = Vec::new();
                for value in hint_values {
                    let target = algorithm.do_precise(available_targets, value)?;
                    if !targets.contains(&target) {
                        targets.push(target);
                    }
                }
                Ok(targets)
            }
            _ => Ok(available_targets.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::algorithm::{ComplexInlineShardingAlgorithm, InlineShardingAlgorithm, RangeValue};

    fn available(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn standard(column: &str, expr: &str) -> ShardingStrategy {
        ShardingStrategy::Standard {
            column: column.to_string(),
            algorithm: Arc::new(InlineShardingAlgorithm::new(expr).unwrap()),
        }
    }

    #[test]
    fn test_standard_equal_in_list() {
        let strategy = standard("order_id", "t_order_${order_id % 2}");
        let cond = ShardingConditionValue::equal("t_order", "order_id", [1i64, 3, 4]);
        let targets = strategy
            .do_sharding(&available(&["t_order_0", "t_order_1"]), &[&cond])
            .unwrap();
        assert_eq!(targets, available(&["t_order_1", "t_order_0"]));
    }

    #[test]
    fn test_standard_without_condition_fans_out() {
        let strategy = standard("order_id", "t_order_${order_id % 2}");
        let other = ShardingConditionValue::equal("t_order", "status", ["PAID"]);
        let targets = strategy
            .do_sharding(&available(&["t_order_0", "t_order_1"]), &[&other])
            .unwrap();
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn test_standard_range() {
        let strategy = standard("order_id", "t_order_${order_id % 2}");
        let cond = ShardingConditionValue::range("t_order", "order_id", RangeValue::closed(4, 4));
        let targets = strategy
            .do_sharding(&available(&["t_order_0", "t_order_1"]), &[&cond])
            .unwrap();
        assert_eq!(targets, available(&["t_order_0"]));
    }

    #[test]
    fn test_complex_receives_tuple() {
        let strategy = ShardingStrategy::Complex {
            columns: vec!["user_id".into(), "order_id".into()],
            algorithm: Arc::new(
                ComplexInlineShardingAlgorithm::new("t_${user_id % 2}_${order_id % 2}").unwrap(),
            ),
        };
        let user = ShardingConditionValue::equal("t", "user_id", [0i64]);
        let order = ShardingConditionValue::equal("t", "order_id", [1i64]);
        let targets = strategy
            .do_sharding(&available(&["t_0_0", "t_0_1", "t_1_0", "t_1_1"]), &[&user, &order])
            .unwrap();
        assert_eq!(targets, available(&["t_0_1"]));
        assert_eq!(strategy.sharding_columns(), vec!["user_id", "order_id"]);
    }

    #[test]
    fn test_hint_strategy() {
        let strategy = ShardingStrategy::Hint {
            algorithm: Arc::new(InlineShardingAlgorithm::new("ds_${value % 2}").unwrap()),
        };
        let ds = available(&["ds_0", "ds_1"]);
        assert_eq!(strategy.do_hint_sharding(&ds, &[5.into()]).unwrap(), available(&["ds_1"]));
        assert_eq!(strategy.do_hint_sharding(&ds, &[]).unwrap(), ds);
        assert_eq!(strategy.kind(), StrategyKind::Hint);
    }

    #[test]
    fn test_none_strategy_keeps_everything() {
        let ds = available(&["ds_0", "ds_1"]);
        assert_eq!(ShardingStrategy::None.do_sharding(&ds, &[]).unwrap(), ds);
        assert_eq!(ShardingStrategy::None.kind().as_str(), "none");
    }
}
