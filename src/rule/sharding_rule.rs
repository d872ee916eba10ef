//! The compiled sharding rule of one logical database

use std::collections::{BTreeMap, BTreeSet};

use super::algorithm::ShardingAlgorithm;
use super::config::{ShardingRuleConfig, StrategyConfig};
use super::data_node::DataNode;
use super::errors::{RuleError, RuleResult};
use super::inline::expand_data_nodes;
use super::strategy::ShardingStrategy;
use super::table_rule::TableRule;
use crate::observability::{log_event, Event};

/// Table rules, broadcast tables, binding groups and known data sources.
///
/// Read-only once built. Table names are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct ShardingRule {
    data_source_names: Vec<String>,
    table_rules: BTreeMap<String, TableRule>,
    broadcast_tables: BTreeSet<String>,
    binding_groups: Vec<Vec<String>>,
    default_database_strategy: ShardingStrategy,
    default_table_strategy: ShardingStrategy,
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl ShardingRule {
    /// Compile and validate a configuration.
    pub fn new(config: ShardingRuleConfig) -> RuleResult<Self> {
        if config.data_sources.is_empty() {
            return Err(RuleError::InvalidConfig("no data sources configured".into()));
        }
        let mut data_source_names: Vec<String> = Vec::with_capacity(config.data_sources.len());
        for name in &config.data_sources {
            if data_source_names.contains(name) {
                return Err(RuleError::InvalidConfig(format!("data source '{}' is declared twice", name)));
            }
            data_source_names.push(name.clone());
        }

        let mut algorithms = BTreeMap::new();
        for (name, algorithm) in &config.sharding_algorithms {
            algorithms.insert(
                name.clone(),
                ShardingAlgorithm::create(&algorithm.algorithm_type, &algorithm.props)?,
            );
        }

        let default_database_strategy = compile_optional(config.default_database_strategy.as_ref(), &algorithms)?
            .unwrap_or(ShardingStrategy::None);
        let default_table_strategy = compile_optional(config.default_table_strategy.as_ref(), &algorithms)?
            .unwrap_or(ShardingStrategy::None);

        let mut table_rules = BTreeMap::new();
        for table in &config.tables {
            let logic_key = key(&table.logic_table);
            if table_rules.contains_key(&logic_key) {
                return Err(RuleError::DuplicateTable(table.logic_table.clone()));
            }
            let nodes = match &table.actual_data_nodes {
                Some(expression) => expand_data_nodes(expression)?,
                None => data_source_names
                    .iter()
                    .map(|ds| DataNode::new(ds.as_str(), table.logic_table.as_str()))
                    .collect(),
            };
            if let Some(unknown) = nodes.iter().find(|n| !data_source_names.contains(&n.data_source_name)) {
                return Err(RuleError::UnknownDataSource {
                    table: table.logic_table.clone(),
                    data_source: unknown.data_source_name.clone(),
                });
            }
            let mut rule = TableRule::new(table.logic_table.as_str(), nodes);
            rule.database_strategy = compile_optional(table.database_strategy.as_ref(), &algorithms)?;
            rule.table_strategy = compile_optional(table.table_strategy.as_ref(), &algorithms)?;
            table_rules.insert(logic_key, rule);
        }

        let mut broadcast_tables = BTreeSet::new();
        for name in &config.broadcast_tables {
            if table_rules.contains_key(&key(name)) {
                return Err(RuleError::InvalidConfig(format!(
                    "table '{}' cannot be both sharded and broadcast",
                    name
                )));
            }
            broadcast_tables.insert(key(name));
        }

        let mut binding_groups = Vec::new();
        for group in &config.binding_tables {
            let members: Vec<String> = group
                .split(',')
                .map(|t| key(t.trim()))
                .filter(|t| !t.is_empty())
                .collect();
            let mut layout = None;
            for member in &members {
                let rule = table_rules
                    .get(member)
                    .ok_or_else(|| RuleError::TableRuleNotFound(member.clone()))?;
                match &layout {
                    None => layout = Some(rule.layout()),
                    Some(expected) if *expected != rule.layout() => {
                        return Err(RuleError::BindingLayoutMismatch(group.clone()));
                    }
                    Some(_) => {}
                }
            }
            if !members.is_empty() {
                binding_groups.push(members);
            }
        }

        let rule = Self {
            data_source_names,
            table_rules,
            broadcast_tables,
            binding_groups,
            default_database_strategy,
            default_table_strategy,
        };
        log_event(
            Event::RuleLoaded,
            &[
                ("data_sources", &rule.data_source_names.len().to_string()),
                ("tables", &rule.table_rules.len().to_string()),
                ("broadcast_tables", &rule.broadcast_tables.len().to_string()),
                ("binding_groups", &rule.binding_groups.len().to_string()),
            ],
        );
        Ok(rule)
    }

    /// Known data sources, in declaration order.
    pub fn data_source_names(&self) -> &[String] {
        &self.data_source_names
    }

    pub fn contains_data_source(&self, name: &str) -> bool {
        self.data_source_names.iter().any(|ds| ds == name)
    }

    pub fn find_table_rule(&self, logic_table: &str) -> Option<&TableRule> {
        self.table_rules.get(&key(logic_table))
    }

    /// Like [`ShardingRule::find_table_rule`], failing when absent.
    pub fn table_rule(&self, logic_table: &str) -> RuleResult<&TableRule> {
        self.find_table_rule(logic_table)
            .ok_or_else(|| RuleError::TableRuleNotFound(logic_table.to_string()))
    }

    pub fn table_rules(&self) -> impl Iterator<Item = &TableRule> {
        self.table_rules.values()
    }

    pub fn is_sharding_table(&self, logic_table: &str) -> bool {
        self.table_rules.contains_key(&key(logic_table))
    }

    pub fn is_broadcast_table(&self, logic_table: &str) -> bool {
        self.broadcast_tables.contains(&key(logic_table))
    }

    /// True when `names` is non-empty and every name is a broadcast table.
    pub fn is_all_broadcast_tables<S: AsRef<str>>(&self, names: &[S]) -> bool {
        !names.is_empty() && names.iter().all(|n| self.is_broadcast_table(n.as_ref()))
    }

    /// Binding group containing `logic_table`, if any
    pub fn find_binding_group(&self, logic_table: &str) -> Option<&[String]> {
        let k = key(logic_table);
        self.binding_groups
            .iter()
            .find(|group| group.contains(&k))
            .map(Vec::as_slice)
    }

    /// True when `names` is non-empty and all names sit in one binding group.
    pub fn is_all_binding_tables<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let Some(first) = names.first() else {
            return false;
        };
        match self.find_binding_group(first.as_ref()) {
            Some(group) => names.iter().all(|n| group.contains(&key(n.as_ref()))),
            None => false,
        }
    }

    /// Names among `names` that have a table rule, in input order
    pub fn sharding_logic_table_names<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        names
            .iter()
            .map(AsRef::as_ref)
            .filter(|n| self.is_sharding_table(n))
            .map(str::to_string)
            .collect()
    }

    /// The first data node of a logic table.
    ///
    /// Broadcast tables without a table rule resolve to the first data source.
    pub fn data_node(&self, logic_table: &str) -> RuleResult<DataNode> {
        if let Some(rule) = self.find_table_rule(logic_table) {
            return rule
                .actual_data_nodes
                .first()
                .cloned()
                .ok_or_else(|| RuleError::TableRuleNotFound(logic_table.to_string()));
        }
        match (self.is_broadcast_table(logic_table), self.data_source_names.first()) {
            (true, Some(ds)) => Ok(DataNode::new(ds.as_str(), logic_table)),
            _ => Err(RuleError::TableRuleNotFound(logic_table.to_string())),
        }
    }

    /// Effective database strategy of a table
    pub fn database_strategy<'r>(&'r self, table_rule: &'r TableRule) -> &'r ShardingStrategy {
        table_rule
            .database_strategy
            .as_ref()
            .unwrap_or(&self.default_database_strategy)
    }

    /// Effective table strategy of a table
    pub fn table_strategy<'r>(&'r self, table_rule: &'r TableRule) -> &'r ShardingStrategy {
        table_rule
            .table_strategy
            .as_ref()
            .unwrap_or(&self.default_table_strategy)
    }

    /// Map `actual_table` of `logic_table` on `data_source_name` to the table
    /// at the same position in the bound table `other_logic_table`.
    pub fn binding_actual_table(
        &self,
        data_source_name: &str,
        logic_table: &str,
        other_logic_table: &str,
        actual_table: &str,
    ) -> RuleResult<String> {
        let rule = self.table_rule(logic_table)?;
        let other = self.table_rule(other_logic_table)?;
        let mismatch = || RuleError::BindingLayoutMismatch(format!("{},{}", logic_table, other_logic_table));
        let index = rule
            .find_actual_table_index(data_source_name, actual_table)
            .ok_or_else(mismatch)?;
        other
            .actual_table_names(data_source_name)
            .into_iter()
            .nth(index)
            .ok_or_else(mismatch)
    }
}

fn compile_optional(
    config: Option<&StrategyConfig>,
    algorithms: &BTreeMap<String, ShardingAlgorithm>,
) -> RuleResult<Option<ShardingStrategy>> {
    config.map(|c| compile_strategy(c, algorithms)).transpose()
}

fn compile_strategy(
    config: &StrategyConfig,
    algorithms: &BTreeMap<String, ShardingAlgorithm>,
) -> RuleResult<ShardingStrategy> {
    let lookup = |name: &str| {
        algorithms
            .get(name)
            .ok_or_else(|| RuleError::UnknownAlgorithm(name.to_string()))
    };
    match config {
        StrategyConfig::None => Ok(ShardingStrategy::None),
        StrategyConfig::Standard {
            sharding_column,
            algorithm_name,
        } => match lookup(algorithm_name)? {
            ShardingAlgorithm::Standard(algorithm) => Ok(ShardingStrategy::Standard {
                column: sharding_column.trim().to_string(),
                algorithm: algorithm.clone(),
            }),
            ShardingAlgorithm::Complex(_) => Err(RuleError::AlgorithmKindMismatch {
                algorithm: algorithm_name.clone(),
                expected: "standard",
            }),
        },
        StrategyConfig::Complex {
            sharding_columns,
            algorithm_name,
        } => {
            let columns: Vec<String> = sharding_columns
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if columns.is_empty() {
                return Err(RuleError::InvalidConfig(format!(
                    "complex strategy '{}' names no sharding columns",
                    algorithm_name
                )));
            }
            match lookup(algorithm_name)? {
                ShardingAlgorithm::Complex(algorithm) => Ok(ShardingStrategy::Complex {
                    columns,
                    algorithm: algorithm.clone(),
                }),
                ShardingAlgorithm::Standard(_) => Err(RuleError::AlgorithmKindMismatch {
                    algorithm: algorithm_name.clone(),
                    expected: "complex",
                }),
            }
        }
        StrategyConfig::Hint { algorithm_name } => match lookup(algorithm_name)? {
            ShardingAlgorithm::Standard(algorithm) => Ok(ShardingStrategy::Hint {
                algorithm: algorithm.clone(),
            }),
            ShardingAlgorithm::Complex(_) => Err(RuleError::AlgorithmKindMismatch {
                algorithm: algorithm_name.clone(),
                expected: "hint",
            }),
        },
    }
}
