//! Sharding rule configuration
//!
//! The serde form of a rule, as loaded from JSON:
//!
//! ```json
//! {
//!   "data_sources": ["ds_0", "ds_1"],
//!   "tables": [{
//!     "logic_table": "t_order",
//!     "actual_data_nodes": "ds_${0..1}.t_order_${0..1}",
//!     "table_strategy": {"standard": {"sharding_column": "order_id", "algorithm_name": "t_order_inline"}}
//!   }],
//!   "broadcast_tables": ["t_config"],
//!   "sharding_algorithms": {
//!     "t_order_inline": {"type": "INLINE", "props": {"algorithm-expression": "t_order_${order_id % 2}"}}
//!   }
//! }
//! ```
//!
//! Nothing here is validated; [`super::ShardingRule::new`] compiles and checks it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{RuleError, RuleResult};

/// Whole-rule configuration for one logical database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingRuleConfig {
    /// Known physical data sources, in declaration order.
    pub data_sources: Vec<String>,
    #[serde(default)]
    pub tables: Vec<TableRuleConfig>,
    /// Groups like `"t_order,t_order_item"`
    #[serde(default)]
    pub binding_tables: Vec<String>,
    #[serde(default)]
    pub broadcast_tables: Vec<String>,
    #[serde(default)]
    pub sharding_algorithms: BTreeMap<String, AlgorithmConfig>,
    #[serde(default)]
    pub default_database_strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub default_table_strategy: Option<StrategyConfig>,
}

/// One sharded logic table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRuleConfig {
    pub logic_table: String,
    /// Inline expression; defaults to `<ds>.<logic_table>` on every data source.
    #[serde(default)]
    pub actual_data_nodes: Option<String>,
    #[serde(default)]
    pub database_strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub table_strategy: Option<StrategyConfig>,
}

impl TableRuleConfig {
    pub fn new(logic_table: impl Into<String>, actual_data_nodes: impl Into<String>) -> Self {
        Self {
            logic_table: logic_table.into(),
            actual_data_nodes: Some(actual_data_nodes.into()),
            database_strategy: None,
            table_strategy: None,
        }
    }
}

/// Strategy binding, externally tagged by kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyConfig {
    Standard {
        sharding_column: String,
        algorithm_name: String,
    },
    Complex {
        /// Comma-separated column list
        sharding_columns: String,
        algorithm_name: String,
    },
    Hint {
        algorithm_name: String,
    },
    None,
}

impl StrategyConfig {
    pub fn standard(column: impl Into<String>, algorithm_name: impl Into<String>) -> Self {
        StrategyConfig::Standard {
            sharding_column: column.into(),
            algorithm_name: algorithm_name.into(),
        }
    }

    pub fn complex(columns: impl Into<String>, algorithm_name: impl Into<String>) -> Self {
        StrategyConfig::Complex {
            sharding_columns: columns.into(),
            algorithm_name: algorithm_name.into(),
        }
    }

    pub fn hint(algorithm_name: impl Into<String>) -> Self {
        StrategyConfig::Hint {
            algorithm_name: algorithm_name.into(),
        }
    }
}

/// Named algorithm: built-in type plus string props
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    #[serde(rename = "type")]
    pub algorithm_type: String,
    #[serde(default)]
    pub props: BTreeMap<String, String>,
}

impl AlgorithmConfig {
    pub fn new(algorithm_type: impl Into<String>) -> Self {
        Self {
            algorithm_type: algorithm_type.into(),
            props: BTreeMap::new(),
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }
}

impl ShardingRuleConfig {
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> RuleResult<Self> {
        serde_json::from_str(json).map_err(|e| RuleError::Load {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Read and parse a JSON file.
    pub fn from_file(path: &Path) -> RuleResult<Self> {
        let load_error = |message: String| RuleError::Load {
            path: path.display().to_string(),
            message,
        };
        let text = fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| load_error(e.to_string()))
    }
}
