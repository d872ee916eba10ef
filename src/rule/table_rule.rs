//! Table rules: one logic table and its actual data nodes

use super::data_node::DataNode;
use super::strategy::ShardingStrategy;

/// Layout and strategies of one logic table.
///
/// Strategies are `None` when the table inherits the rule defaults.
#[derive(Debug, Clone)]
pub struct TableRule {
    pub logic_table: String,
    pub actual_data_nodes: Vec<DataNode>,
    pub database_strategy: Option<ShardingStrategy>,
    pub table_strategy: Option<ShardingStrategy>,
}

impl TableRule {
    pub fn new(logic_table: impl Into<String>, actual_data_nodes: Vec<DataNode>) -> Self {
        Self {
            logic_table: logic_table.into(),
            actual_data_nodes,
            database_strategy: None,
            table_strategy: None,
        }
    }

    pub fn with_database_strategy(mut self, strategy: ShardingStrategy) -> Self {
        self.database_strategy = Some(strategy);
        self
    }

    pub fn with_table_strategy(mut self, strategy: ShardingStrategy) -> Self {
        self.table_strategy = Some(strategy);
        self
    }

    /// Data sources spanned by the actual data nodes, in node order.
    pub fn actual_data_source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for node in &self.actual_data_nodes {
            if !names.contains(&node.data_source_name) {
                names.push(node.data_source_name.clone());
            }
        }
        names
    }

    /// Actual tables on one data source, in node order.
    pub fn actual_table_names(&self, data_source_name: &str) -> Vec<String> {
        self.actual_data_nodes
            .iter()
            .filter(|n| n.data_source_name == data_source_name)
            .map(|n| n.table_name.clone())
            .collect()
    }

    /// First actual table on the given data source
    pub fn first_actual_table(&self, data_source_name: &str) -> Option<&str> {
        self.actual_data_nodes
            .iter()
            .find(|n| n.data_source_name == data_source_name)
            .map(|n| n.table_name.as_str())
    }

    /// Position of `actual_table` among the tables on `data_source_name`.
    pub fn find_actual_table_index(&self, data_source_name: &str, actual_table: &str) -> Option<usize> {
        self.actual_data_nodes
            .iter()
            .filter(|n| n.data_source_name == data_source_name)
            .position(|n| n.table_name.eq_ignore_ascii_case(actual_table))
    }

    /// Node count per data source, used to compare binding layouts.
    pub(crate) fn layout(&self) -> Vec<(String, usize)> {
        self.actual_data_source_names()
            .into_iter()
            .map(|ds| {
                let count = self.actual_table_names(&ds).len();
                (ds, count)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::inline::expand_data_nodes;

    fn order_rule() -> TableRule {
        TableRule::new("t_order", expand_data_nodes("ds_${0..1}.t_order_${0..1}").unwrap())
    }

    #[test]
    fn test_data_source_and_table_names() {
        let rule = order_rule();
        assert_eq!(rule.actual_data_source_names(), vec!["ds_0", "ds_1"]);
        assert_eq!(rule.actual_table_names("ds_1"), vec!["t_order_0", "t_order_1"]);
        assert!(rule.actual_table_names("ds_9").is_empty());
        assert_eq!(rule.first_actual_table("ds_0"), Some("t_order_0"));
    }

    #[test]
    fn test_find_actual_table_index() {
        let rule = order_rule();
        assert_eq!(rule.find_actual_table_index("ds_1", "t_order_1"), Some(1));
        assert_eq!(rule.find_actual_table_index("ds_1", "t_order_7"), None);
    }

    #[test]
    fn test_layout() {
        assert_eq!(
            order_rule().layout(),
            vec![("ds_0".to_string(), 2), ("ds_1".to_string(), 2)]
        );
    }
}
