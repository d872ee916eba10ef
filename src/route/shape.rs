//! Statement shapes and hint context
//!
//! The caller classifies a bound statement once; the engine only matches on
//! the resulting shape.

use std::collections::BTreeMap;

use crate::rule::{RangeValue, ShardingConditionValue, ShardingValue};

/// An AND of column predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardingCondition {
    pub values: Vec<ShardingConditionValue>,
}

impl ShardingCondition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `column IN (values)` on `table`.
    pub fn equal(
        mut self,
        table: &str,
        column: &str,
        values: impl IntoIterator<Item = impl Into<ShardingValue>>,
    ) -> Self {
        self.values.push(ShardingConditionValue::equal(table, column, values));
        self
    }

    /// Add a range predicate on `table.column`.
    pub fn range(mut self, table: &str, column: &str, range: RangeValue) -> Self {
        self.values.push(ShardingConditionValue::range(table, column, range));
        self
    }

    /// Predicates on `logic_table`
    pub fn values_for<'c>(&'c self, logic_table: &str) -> Vec<&'c ShardingConditionValue> {
        self.values
            .iter()
            .filter(|v| v.table.eq_ignore_ascii_case(logic_table))
            .collect()
    }
}

/// A sharded logic table plus the tables bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardingTarget {
    pub logic_table: String,
    /// Binding tables routed alongside `logic_table`
    pub binding_tables: Vec<String>,
    /// OR of conditions; empty means no usable predicate.
    pub conditions: Vec<ShardingCondition>,
}

impl ShardingTarget {
    pub fn new(logic_table: impl Into<String>) -> Self {
        Self {
            logic_table: logic_table.into(),
            binding_tables: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn with_binding_table(mut self, table: impl Into<String>) -> Self {
        self.binding_tables.push(table.into());
        self
    }

    pub fn with_condition(mut self, condition: ShardingCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Primary table followed by binding tables
    pub fn tables(&self) -> Vec<&str> {
        std::iter::once(self.logic_table.as_str())
            .chain(self.binding_tables.iter().map(String::as_str))
            .collect()
    }
}

/// Routing shape of a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementShape {
    /// Single sharding column
    Standard(ShardingTarget),
    /// Several sharding columns
    Complex(ShardingTarget),
    /// Needs exactly one target
    Unicast { tables: Vec<String> },
    /// Every data source
    Broadcast { tables: Vec<String> },
    /// Every actual data node of each table (DDL)
    TableBroadcast { tables: Vec<String> },
    /// Several sharded tables not bound together, e.g. a join
    Join(Vec<ShardingTarget>),
}

impl StatementShape {
    pub fn unicast<S: Into<String>>(tables: impl IntoIterator<Item = S>) -> Self {
        StatementShape::Unicast {
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    pub fn broadcast<S: Into<String>>(tables: impl IntoIterator<Item = S>) -> Self {
        StatementShape::Broadcast {
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    pub fn table_broadcast<S: Into<String>>(tables: impl IntoIterator<Item = S>) -> Self {
        StatementShape::TableBroadcast {
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    pub fn join(targets: impl IntoIterator<Item = ShardingTarget>) -> Self {
        StatementShape::Join(targets.into_iter().collect())
    }

    /// Every logic table the statement references
    pub fn tables(&self) -> Vec<&str> {
        match self {
            StatementShape::Standard(target) | StatementShape::Complex(target) => target.tables(),
            StatementShape::Unicast { tables }
            | StatementShape::Broadcast { tables }
            | StatementShape::TableBroadcast { tables } => tables.iter().map(String::as_str).collect(),
            StatementShape::Join(targets) => targets.iter().flat_map(ShardingTarget::tables).collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StatementShape::Standard(_) => "standard",
            StatementShape::Complex(_) => "complex",
            StatementShape::Unicast { .. } => "unicast",
            StatementShape::Broadcast { .. } => "broadcast",
            StatementShape::TableBroadcast { .. } => "table_broadcast",
            StatementShape::Join(_) => "join",
        }
    }
}

/// Per-call routing hints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintContext {
    data_source_name: Option<String>,
    database_values: BTreeMap<String, Vec<ShardingValue>>,
    table_values: BTreeMap<String, Vec<ShardingValue>>,
}

impl HintContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route straight to `data_source_name`.
    pub fn with_data_source(mut self, data_source_name: impl Into<String>) -> Self {
        self.data_source_name = Some(data_source_name.into());
        self
    }

    /// Value fed to the database hint strategy of `logic_table`.
    pub fn add_database_value(mut self, logic_table: &str, value: impl Into<ShardingValue>) -> Self {
        self.database_values
            .entry(logic_table.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    /// Value fed to the table hint strategy of `logic_table`.
    pub fn add_table_value(mut self, logic_table: &str, value: impl Into<ShardingValue>) -> Self {
        self.table_values
            .entry(logic_table.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    pub fn find_hint_data_source_name(&self) -> Option<&str> {
        self.data_source_name.as_deref()
    }

    pub fn database_sharding_values(&self, logic_table: &str) -> &[ShardingValue] {
        self.database_values
            .get(&logic_table.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn table_sharding_values(&self, logic_table: &str) -> &[ShardingValue] {
        self.table_values
            .get(&logic_table.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
