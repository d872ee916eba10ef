//! Execution units and groups

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One rewritten statement ready to run against one physical target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlUnit {
    pub sql: String,
    #[serde(default)]
    pub parameters: Vec<Value>,
}

impl SqlUnit {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters(sql: impl Into<String>, parameters: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            parameters,
        }
    }
}

/// A [`SqlUnit`] bound to a physical data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionUnit {
    pub data_source_name: String,
    pub sql_unit: SqlUnit,
}

impl ExecutionUnit {
    pub fn new(data_source_name: impl Into<String>, sql_unit: SqlUnit) -> Self {
        Self {
            data_source_name: data_source_name.into(),
            sql_unit,
        }
    }
}

/// Connection usage policy for one data source within one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionMode {
    /// Many statements share one connection, one after another.
    MemoryStrictly,
    /// One connection per statement.
    ConnectionStrictly,
}

impl ConnectionMode {
    /// `ConnectionStrictly` when every unit can have its own connection.
    pub fn for_units(max_connections_size_per_query: usize, unit_count: usize) -> Self {
        if max_connections_size_per_query >= unit_count {
            ConnectionMode::ConnectionStrictly
        } else {
            ConnectionMode::MemoryStrictly
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMode::MemoryStrictly => "MEMORY_STRICTLY",
            ConnectionMode::ConnectionStrictly => "CONNECTION_STRICTLY",
        }
    }
}

/// An execution unit paired with the connection it runs on.
///
/// Units of one group hold clones of the same connection handle.
#[derive(Debug, Clone)]
pub struct StatementExecuteUnit<C> {
    pub execution_unit: ExecutionUnit,
    pub connection_mode: ConnectionMode,
    pub connection: C,
}

/// Inputs sharing one physical connection; the unit of parallel dispatch.
#[derive(Debug, Clone)]
pub struct InputGroup<T> {
    pub inputs: Vec<T>,
}

impl<T> InputGroup<T> {
    pub fn new(inputs: Vec<T>) -> Self {
        Self { inputs }
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connection_mode_choice() {
        assert_eq!(ConnectionMode::for_units(4, 4), ConnectionMode::ConnectionStrictly);
        assert_eq!(ConnectionMode::for_units(8, 2), ConnectionMode::ConnectionStrictly);
        assert_eq!(ConnectionMode::for_units(1, 2), ConnectionMode::MemoryStrictly);
        assert_eq!(ConnectionMode::MemoryStrictly.as_str(), "MEMORY_STRICTLY");
    }

    #[test]
    fn test_sql_unit_serde() {
        let unit = SqlUnit::with_parameters("SELECT * FROM t_order_0 WHERE order_id = ?", vec![json!(10)]);
        let value = serde_json::to_value(&unit).unwrap();
        assert_eq!(value["parameters"][0], 10);
        let parsed: SqlUnit = serde_json::from_value(json!({"sql": "SELECT 1"})).unwrap();
        assert!(parsed.parameters.is_empty());
    }
}
