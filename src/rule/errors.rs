//! Rule model errors
//!
//! Every variant here is a configuration fault: the rule cannot describe a
//! valid layout, or an algorithm produced a target outside that layout.

use thiserror::Error;

/// Result type for rule operations
pub type RuleResult<T> = Result<T, RuleError>;

/// Rule model errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Invalid sharding configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid inline expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("Sharding algorithm '{0}' is not configured")]
    UnknownAlgorithm(String),

    #[error("Unsupported sharding algorithm type '{0}'")]
    UnsupportedAlgorithmType(String),

    #[error("Algorithm '{algorithm}' cannot serve a {expected} strategy")]
    AlgorithmKindMismatch { algorithm: String, expected: &'static str },

    #[error("Table '{0}' is configured more than once")]
    DuplicateTable(String),

    #[error("Table '{table}' references unknown data source '{data_source}'")]
    UnknownDataSource { table: String, data_source: String },

    #[error("Cannot find table rule for logic table '{0}'")]
    TableRuleNotFound(String),

    #[error("Routed target '{target}' is not an actual data node (available: {available})")]
    TargetNotInDataNodes { target: String, available: String },

    #[error("Invalid sharding value for '{column}': {reason}")]
    InvalidShardingValue { column: String, reason: String },

    #[error("Binding tables {0} do not share the same data node layout")]
    BindingLayoutMismatch(String),

    #[error("Failed to load sharding configuration from '{path}': {message}")]
    Load { path: String, message: String },
}

impl RuleError {
    /// Create an invalid expression error
    pub fn invalid_expression(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        RuleError::InvalidExpression {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Create an error for a routed target outside the available targets
    pub fn target_not_in_data_nodes(target: impl Into<String>, available: &[String]) -> Self {
        RuleError::TargetNotInDataNodes {
            target: target.into(),
            available: available.join(","),
        }
    }

    /// Create an invalid sharding value error
    pub fn invalid_value(column: impl Into<String>, reason: impl Into<String>) -> Self {
        RuleError::InvalidShardingValue {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            RuleError::InvalidConfig(_) => "SHARD_RULE_INVALID_CONFIG",
            RuleError::InvalidExpression { .. } => "SHARD_RULE_INVALID_EXPRESSION",
            RuleError::UnknownAlgorithm(_) => "SHARD_RULE_UNKNOWN_ALGORITHM",
            RuleError::UnsupportedAlgorithmType(_) => "SHARD_RULE_UNSUPPORTED_ALGORITHM",
            RuleError::AlgorithmKindMismatch { .. } => "SHARD_RULE_ALGORITHM_KIND_MISMATCH",
            RuleError::DuplicateTable(_) => "SHARD_RULE_DUPLICATE_TABLE",
            RuleError::UnknownDataSource { .. } => "SHARD_RULE_UNKNOWN_DATA_SOURCE",
            RuleError::TableRuleNotFound(_) => "SHARD_RULE_TABLE_NOT_FOUND",
            RuleError::TargetNotInDataNodes { .. } => "SHARD_RULE_TARGET_NOT_IN_NODES",
            RuleError::InvalidShardingValue { .. } => "SHARD_RULE_INVALID_VALUE",
            RuleError::BindingLayoutMismatch(_) => "SHARD_RULE_BINDING_MISMATCH",
            RuleError::Load { .. } => "SHARD_RULE_LOAD_FAILED",
        }
    }
}
