//! Route results

use serde::Serialize;

/// Logical name to actual name alias
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RouteMapper {
    pub logic_name: String,
    pub actual_name: String,
}

impl RouteMapper {
    pub fn new(logic_name: impl Into<String>, actual_name: impl Into<String>) -> Self {
        Self {
            logic_name: logic_name.into(),
            actual_name: actual_name.into(),
        }
    }

    /// Logical and actual name are the same
    pub fn identity(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            logic_name: name.clone(),
            actual_name: name,
        }
    }
}

/// One physical destination: a data source plus the actual tables on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RouteUnit {
    pub data_source_mapper: RouteMapper,
    pub table_mappers: Vec<RouteMapper>,
}

impl RouteUnit {
    pub fn new(data_source_mapper: RouteMapper, table_mappers: Vec<RouteMapper>) -> Self {
        Self {
            data_source_mapper,
            table_mappers,
        }
    }

    /// Actual data source name
    pub fn data_source_name(&self) -> &str {
        &self.data_source_mapper.actual_name
    }

    pub fn logic_table_names(&self) -> impl Iterator<Item = &str> {
        self.table_mappers.iter().map(|m| m.logic_name.as_str())
    }

    /// Mapper for `logic_table`, matched case-insensitively
    pub fn find_table_mapper(&self, logic_table: &str) -> Option<&RouteMapper> {
        self.table_mappers
            .iter()
            .find(|m| m.logic_name.eq_ignore_ascii_case(logic_table))
    }
}

/// Full physical fan-out of one statement.
///
/// Units are unique; insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteContext {
    route_units: Vec<RouteUnit>,
}

impl RouteContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit unless an equal one is already present.
    pub fn add_route_unit(&mut self, unit: RouteUnit) {
        if !self.route_units.contains(&unit) {
            self.route_units.push(unit);
        }
    }

    pub fn route_units(&self) -> &[RouteUnit] {
        &self.route_units
    }

    pub fn into_route_units(self) -> Vec<RouteUnit> {
        self.route_units
    }

    pub fn len(&self) -> usize {
        self.route_units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.route_units.is_empty()
    }

    pub fn is_single_route_unit(&self) -> bool {
        self.route_units.len() == 1
    }

    /// Distinct actual data sources, in unit order
    pub fn actual_data_source_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for unit in &self.route_units {
            if !names.contains(&unit.data_source_name()) {
                names.push(unit.data_source_name());
            }
        }
        names
    }

    /// Distinct logic tables across all units, in unit order
    pub fn logic_table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.route_units.iter().flat_map(RouteUnit::logic_table_names) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// First unit on the given actual data source
    pub fn find_route_unit(&self, data_source_name: &str) -> Option<&RouteUnit> {
        self.route_units
            .iter()
            .find(|u| u.data_source_name() == data_source_name)
    }
}

impl FromIterator<RouteUnit> for RouteContext {
    fn from_iter<I: IntoIterator<Item = RouteUnit>>(iter: I) -> Self {
        let mut context = RouteContext::new();
        for unit in iter {
            context.add_route_unit(unit);
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(ds: &str, tables: &[(&str, &str)]) -> RouteUnit {
        RouteUnit::new(
            RouteMapper::identity(ds),
            tables.iter().map(|(l, a)| RouteMapper::new(*l, *a)).collect(),
        )
    }

    #[test]
    fn test_dedupe_keeps_order() {
        let context: RouteContext = vec![
            unit("ds_1", &[("t_order", "t_order_1")]),
            unit("ds_0", &[("t_order", "t_order_0")]),
            unit("ds_1", &[("t_order", "t_order_1")]),
        ]
        .into_iter()
        .collect();
        assert_eq!(context.len(), 2);
        assert_eq!(context.actual_data_source_names(), vec!["ds_1", "ds_0"]);
        assert!(!context.is_single_route_unit());
    }

    #[test]
    fn test_lookups() {
        let mut context = RouteContext::new();
        context.add_route_unit(unit("ds_0", &[("t_order", "t_order_0"), ("t_config", "t_config")]));
        context.add_route_unit(unit("ds_0", &[("t_order", "t_order_1")]));
        assert_eq!(context.logic_table_names(), vec!["t_order", "t_config"]);
        let found = context.find_route_unit("ds_0").unwrap();
        assert_eq!(found.find_table_mapper("T_ORDER").unwrap().actual_name, "t_order_0");
        assert!(context.find_route_unit("ds_1").is_none());
    }

    #[test]
    fn test_serializes_for_explain() {
        let mut context = RouteContext::new();
        context.add_route_unit(unit("ds_0", &[]));
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json["route_units"][0]["data_source_mapper"]["actual_name"], "ds_0");
    }
}
