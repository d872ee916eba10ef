//! Routing errors
//!
//! Two classes:
//! - No match: the inputs are well-formed but no target satisfies them
//!   (hint names an unknown data source, tables share no data source)
//! - Misconfiguration: the rule cannot route the statement at all
//!
//! Both always propagate; routing has no degraded mode.

use thiserror::Error;

use crate::rule::RuleError;

/// Result type for routing
pub type RouteResult<T> = Result<T, RouteError>;

/// Routing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Hint data source '{0}' does not exist")]
    HintDataSourceNotExists(String),

    #[error("No common data source for logic tables {}", .0.join(","))]
    NoCommonDataSource(Vec<String>),

    #[error("Cannot find table rule for logic table '{0}'")]
    TableRuleNotFound(String),

    #[error("Routing logic table '{0}' produced no targets")]
    NoRouteTargets(String),

    #[error("Table '{table}' uses a {actual} strategy, statement requires {expected}")]
    StrategyMismatch {
        table: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error(transparent)]
    Rule(#[from] RuleError),
}

impl RouteError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            RouteError::HintDataSourceNotExists(_) => "SHARD_ROUTE_HINT_DATA_SOURCE_NOT_EXISTS",
            RouteError::NoCommonDataSource(_) => "SHARD_ROUTE_NO_COMMON_DATA_SOURCE",
            RouteError::TableRuleNotFound(_) => "SHARD_ROUTE_TABLE_RULE_NOT_FOUND",
            RouteError::NoRouteTargets(_) => "SHARD_ROUTE_NO_TARGETS",
            RouteError::StrategyMismatch { .. } => "SHARD_ROUTE_STRATEGY_MISMATCH",
            RouteError::Rule(inner) => inner.code(),
        }
    }

    /// Expected "no match" outcome, as opposed to misconfiguration.
    pub fn is_no_match(&self) -> bool {
        matches!(
            self,
            RouteError::HintDataSourceNotExists(_)
                | RouteError::NoCommonDataSource(_)
                | RouteError::TableRuleNotFound(_)
                | RouteError::NoRouteTargets(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_classification() {
        assert!(RouteError::HintDataSourceNotExists("ds_9".into()).is_no_match());
        assert!(RouteError::NoCommonDataSource(vec!["a".into(), "b".into()]).is_no_match());
        assert!(!RouteError::Rule(RuleError::InvalidConfig("x".into())).is_no_match());
        assert!(!RouteError::StrategyMismatch {
            table: "t".into(),
            expected: "standard",
            actual: "complex",
        }
        .is_no_match());
    }

    #[test]
    fn test_messages_and_codes() {
        let err = RouteError::NoCommonDataSource(vec!["t_a".into(), "t_b".into()]);
        assert_eq!(err.to_string(), "No common data source for logic tables t_a,t_b");
        assert_eq!(err.code(), "SHARD_ROUTE_NO_COMMON_DATA_SOURCE");

        let wrapped: RouteError = RuleError::UnknownAlgorithm("x".into()).into();
        assert_eq!(wrapped.code(), "SHARD_RULE_UNKNOWN_ALGORITHM");
    }
}
