//! Actual data nodes

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{RuleError, RuleResult};

/// A concrete (physical data source, physical table) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DataNode {
    pub data_source_name: String,
    pub table_name: String,
}

impl DataNode {
    pub fn new(data_source_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            data_source_name: data_source_name.into(),
            table_name: table_name.into(),
        }
    }

    /// Parse `"<data_source>.<table>"`.
    ///
    /// Exactly one separator is allowed; both sides must be non-empty.
    pub fn parse(text: &str) -> RuleResult<Self> {
        let trimmed = text.trim();
        let mut parts = trimmed.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(ds), Some(table), None) if !ds.is_empty() && !table.is_empty() => {
                Ok(Self::new(ds, table))
            }
            _ => Err(RuleError::invalid_expression(
                text,
                "data node must be formatted as <data_source>.<table>",
            )),
        }
    }
}

impl fmt::Display for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.data_source_name, self.table_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let node = DataNode::parse(" ds_0.t_order_1 ").unwrap();
        assert_eq!(node, DataNode::new("ds_0", "t_order_1"));
        assert_eq!(node.to_string(), "ds_0.t_order_1");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(DataNode::parse("t_order").is_err());
        assert!(DataNode::parse("ds.t.extra").is_err());
        assert!(DataNode::parse(".t_order").is_err());
        assert!(DataNode::parse("ds_0.").is_err());
    }
}
