//! Sharding values and algorithms
//!
//! Algorithms pick targets (data source names or actual table names) out of
//! the available targets for one logic table. They never invent targets: a
//! computed target missing from the available list is a configuration error.
//!
//! Built-in types:
//! - `INLINE`: `algorithm-expression` with one `${column % n}` placeholder
//! - `MOD`: `sharding-count`, target chosen by its `_<value % count>` suffix
//! - `COMPLEX_INLINE`: `algorithm-expression` over several columns

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{RuleError, RuleResult};
use super::inline::AlgorithmExpression;

/// A sharding column value taken from a predicate or a hint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShardingValue {
    Int(i64),
    Text(String),
}

impl ShardingValue {
    /// Integer view of the value; numeric text is accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ShardingValue::Int(v) => Some(*v),
            ShardingValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ShardingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardingValue::Int(v) => write!(f, "{}", v),
            ShardingValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ShardingValue {
    fn from(v: i64) -> Self {
        ShardingValue::Int(v)
    }
}

impl From<i32> for ShardingValue {
    fn from(v: i32) -> Self {
        ShardingValue::Int(v as i64)
    }
}

impl From<&str> for ShardingValue {
    fn from(v: &str) -> Self {
        ShardingValue::Text(v.to_string())
    }
}

impl From<String> for ShardingValue {
    fn from(v: String) -> Self {
        ShardingValue::Text(v)
    }
}

/// One end of a range predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeBound {
    pub value: ShardingValue,
    pub inclusive: bool,
}

/// A range predicate; a missing bound is unbounded on that side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeValue {
    pub lower: Option<RangeBound>,
    pub upper: Option<RangeBound>,
}

impl RangeValue {
    /// `BETWEEN lo AND hi`
    pub fn closed(lo: impl Into<ShardingValue>, hi: impl Into<ShardingValue>) -> Self {
        Self {
            lower: Some(RangeBound { value: lo.into(), inclusive: true }),
            upper: Some(RangeBound { value: hi.into(), inclusive: true }),
        }
    }

    /// `>= lo`
    pub fn at_least(lo: impl Into<ShardingValue>) -> Self {
        Self {
            lower: Some(RangeBound { value: lo.into(), inclusive: true }),
            upper: None,
        }
    }

    /// `> lo`
    pub fn greater_than(lo: impl Into<ShardingValue>) -> Self {
        Self {
            lower: Some(RangeBound { value: lo.into(), inclusive: false }),
            upper: None,
        }
    }

    /// `<= hi`
    pub fn at_most(hi: impl Into<ShardingValue>) -> Self {
        Self {
            lower: None,
            upper: Some(RangeBound { value: hi.into(), inclusive: true }),
        }
    }

    /// `< hi`
    pub fn less_than(hi: impl Into<ShardingValue>) -> Self {
        Self {
            lower: None,
            upper: Some(RangeBound { value: hi.into(), inclusive: false }),
        }
    }

    /// Inclusive integer bounds, or `None` when either side is unbounded or
    /// not an integer.
    pub fn integer_bounds(&self) -> Option<(i64, i64)> {
        let lower = self.lower.as_ref()?;
        let upper = self.upper.as_ref()?;
        let lo = lower.value.as_i64()?;
        let hi = upper.value.as_i64()?;
        let lo = if lower.inclusive { lo } else { lo.checked_add(1)? };
        let hi = if upper.inclusive { hi } else { hi.checked_sub(1)? };
        Some((lo, hi))
    }
}

/// Values a predicate supplies for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnValues {
    /// `=` or `IN (...)`
    In(Vec<ShardingValue>),
    /// `BETWEEN`, `<`, `>=`, ...
    Range(RangeValue),
}

/// Column values handed to a complex (multi-column) algorithm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplexShardingValues {
    pub column_values: BTreeMap<String, Vec<ShardingValue>>,
    pub column_ranges: BTreeMap<String, RangeValue>,
}

/// Single-column algorithm: precise lookups for equality, range lookups for
/// range predicates.
pub trait StandardShardingAlgorithm: Send + Sync + fmt::Debug {
    /// Algorithm type name as configured (`INLINE`, `MOD`, ...)
    fn algorithm_type(&self) -> &str;

    /// The one target holding `value`.
    fn do_precise(&self, available_targets: &[String], value: &ShardingValue) -> RuleResult<String>;

    /// Every target that may hold a value inside `range`.
    fn do_range(&self, available_targets: &[String], range: &RangeValue) -> RuleResult<Vec<String>>;
}

/// Multi-column algorithm; receives the full column tuple.
pub trait ComplexShardingAlgorithm: Send + Sync + fmt::Debug {
    fn algorithm_type(&self) -> &str;

    fn do_sharding(
        &self,
        available_targets: &[String],
        values: &ComplexShardingValues,
    ) -> RuleResult<Vec<String>>;
}

/// A compiled algorithm, as referenced by strategies.
#[derive(Debug, Clone)]
pub enum ShardingAlgorithm {
    Standard(Arc<dyn StandardShardingAlgorithm>),
    Complex(Arc<dyn ComplexShardingAlgorithm>),
}

impl ShardingAlgorithm {
    /// Build a built-in algorithm from its configured type and props.
    pub fn create(algorithm_type: &str, props: &BTreeMap<String, String>) -> RuleResult<Self> {
        match algorithm_type.to_ascii_uppercase().as_str() {
            "INLINE" => Ok(ShardingAlgorithm::Standard(Arc::new(InlineShardingAlgorithm::new(
                required_prop(props, "algorithm-expression")?,
            )?))),
            "MOD" => {
                let count = required_prop(props, "sharding-count")?;
                let count: u64 = count.trim().parse().map_err(|_| {
                    RuleError::InvalidConfig(format!("sharding-count '{}' is not a positive integer", count))
                })?;
                Ok(ShardingAlgorithm::Standard(Arc::new(ModShardingAlgorithm::new(count)?)))
            }
            "COMPLEX_INLINE" => Ok(ShardingAlgorithm::Complex(Arc::new(
                ComplexInlineShardingAlgorithm::new(required_prop(props, "algorithm-expression")?)?,
            ))),
            other => Err(RuleError::UnsupportedAlgorithmType(other.to_string())),
        }
    }
}

fn required_prop<'a>(props: &'a BTreeMap<String, String>, key: &str) -> RuleResult<&'a str> {
    props
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| RuleError::InvalidConfig(format!("missing algorithm property '{}'", key)))
}

fn ensure_available(target: String, available_targets: &[String]) -> RuleResult<String> {
    available_targets
        .iter()
        .find(|t| t.eq_ignore_ascii_case(&target))
        .cloned()
        .ok_or_else(|| RuleError::target_not_in_data_nodes(target, available_targets))
}

fn push_unique(targets: &mut Vec<String>, target: String) {
    if !targets.contains(&target) {
        targets.push(target);
    }
}

/// Values of a range that hit distinct residue classes, or `None` when the
/// range covers all of them. Empty when `lo > hi`.
fn covered_residues(range: &RangeValue, modulus: u64) -> Option<RangeInclusive<i64>> {
    let (lo, hi) = range.integer_bounds()?;
    if lo <= hi && (hi as i128) - (lo as i128) + 1 >= modulus as i128 {
        return None;
    }
    Some(lo..=hi)
}

/// Targets of `values`, stopping once every available target is hit.
fn collect_range_targets(
    available_targets: &[String],
    values: RangeInclusive<i64>,
    precise: impl Fn(&ShardingValue) -> RuleResult<String>,
) -> RuleResult<Vec<String>> {
    let mut targets = Vec::new();
    for v in values {
        if targets.len() == available_targets.len() {
            break;
        }
        push_unique(&mut targets, precise(&ShardingValue::Int(v))?);
    }
    Ok(targets)
}

/// `INLINE`: `t_order_${order_id % 2}`
#[derive(Debug)]
pub struct InlineShardingAlgorithm {
    expression: AlgorithmExpression,
}

impl InlineShardingAlgorithm {
    pub fn new(expression: &str) -> RuleResult<Self> {
        let expression = AlgorithmExpression::parse(expression)?;
        if expression.columns().len() != 1 {
            return Err(RuleError::invalid_expression(
                expression.source(),
                "INLINE expressions take exactly one sharding column",
            ));
        }
        Ok(Self { expression })
    }
}

impl StandardShardingAlgorithm for InlineShardingAlgorithm {
    fn algorithm_type(&self) -> &str {
        "INLINE"
    }

    fn do_precise(&self, available_targets: &[String], value: &ShardingValue) -> RuleResult<String> {
        let target = self.expression.render(|_| Some(value))?;
        ensure_available(target, available_targets)
    }

    fn do_range(&self, available_targets: &[String], range: &RangeValue) -> RuleResult<Vec<String>> {
        let residues = self
            .expression
            .single_modulus()
            .and_then(|modulus| covered_residues(range, modulus));
        match residues {
            None => Ok(available_targets.to_vec()),
            Some(values) => {
                collect_range_targets(available_targets, values, |v| self.do_precise(available_targets, v))
            }
        }
    }
}

/// `MOD`: picks the target whose name ends in `_<value % count>`.
#[derive(Debug)]
pub struct ModShardingAlgorithm {
    sharding_count: u64,
}

impl ModShardingAlgorithm {
    pub fn new(sharding_count: u64) -> RuleResult<Self> {
        if sharding_count == 0 {
            return Err(RuleError::InvalidConfig("sharding-count must be positive".into()));
        }
        Ok(Self { sharding_count })
    }
}

impl StandardShardingAlgorithm for ModShardingAlgorithm {
    fn algorithm_type(&self) -> &str {
        "MOD"
    }

    fn do_precise(&self, available_targets: &[String], value: &ShardingValue) -> RuleResult<String> {
        let v = value
            .as_i64()
            .ok_or_else(|| RuleError::invalid_value(value.to_string(), "MOD requires an integer"))?;
        let suffix = format!("_{}", (v as i128).rem_euclid(self.sharding_count as i128));
        available_targets
            .iter()
            .find(|t| t.ends_with(&suffix))
            .cloned()
            .ok_or_else(|| RuleError::target_not_in_data_nodes(format!("*{}", suffix), available_targets))
    }

    fn do_range(&self, available_targets: &[String], range: &RangeValue) -> RuleResult<Vec<String>> {
        match covered_residues(range, self.sharding_count) {
            None => Ok(available_targets.to_vec()),
            Some(values) => {
                collect_range_targets(available_targets, values, |v| self.do_precise(available_targets, v))
            }
        }
    }
}

/// `COMPLEX_INLINE`: `t_order_${user_id % 2}_${order_id % 2}`
///
/// Evaluated over the cartesian product of the `IN` values of every column.
/// If any referenced column is missing or only range-constrained, all
/// available targets are returned.
#[derive(Debug)]
pub struct ComplexInlineShardingAlgorithm {
    expression: AlgorithmExpression,
}

impl ComplexInlineShardingAlgorithm {
    pub fn new(expression: &str) -> RuleResult<Self> {
        Ok(Self {
            expression: AlgorithmExpression::parse(expression)?,
        })
    }
}

impl ComplexShardingAlgorithm for ComplexInlineShardingAlgorithm {
    fn algorithm_type(&self) -> &str {
        "COMPLEX_INLINE"
    }

    fn do_sharding(
        &self,
        available_targets: &[String],
        values: &ComplexShardingValues,
    ) -> RuleResult<Vec<String>> {
        let columns = self.expression.columns();
        let mut value_lists: Vec<(&str, &Vec<ShardingValue>)> = Vec::with_capacity(columns.len());
        for column in &columns {
            match values.column_values.get(*column) {
                Some(list) if !list.is_empty() => value_lists.push((*column, list)),
                _ => return Ok(available_targets.to_vec()),
            }
        }

        let mut combinations: Vec<Vec<&ShardingValue>> = vec![Vec::new()];
        for (_, list) in &value_lists {
            combinations = combinations
                .iter()
                .flat_map(|prefix| {
                    list.iter().map(move |v| {
                        let mut next = prefix.clone();
                        next.push(v);
                        next
                    })
                })
                .collect();
        }

        let mut targets = Vec::new();
        for combination in combinations {
            let target = self.expression.render(|column| {
                value_lists
                    .iter()
                    .position(|(c, _)| *c == column)
                    .map(|i| combination[i])
            })?;
            push_unique(&mut targets, ensure_available(target, available_targets)?);
        }
        Ok(targets)
    }
}
