//! Execution context: route units turned into execution units

use crate::route::{RouteContext, RouteUnit};

use super::unit::{ExecutionUnit, SqlUnit};

/// Produces the rewritten SQL for one route unit.
///
/// Implemented by the rewrite stage; a route unit may yield several units.
pub trait RouteUnitRewriter {
    fn rewrite(&self, route_unit: &RouteUnit) -> Vec<SqlUnit>;
}

impl<F> RouteUnitRewriter for F
where
    F: Fn(&RouteUnit) -> Vec<SqlUnit>,
{
    fn rewrite(&self, route_unit: &RouteUnit) -> Vec<SqlUnit> {
        self(route_unit)
    }
}

/// Route result plus the execution units derived from it
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    route_context: RouteContext,
    execution_units: Vec<ExecutionUnit>,
}

impl ExecutionContext {
    /// Rewrite every route unit, keeping route order.
    pub fn build(route_context: RouteContext, rewriter: &dyn RouteUnitRewriter) -> Self {
        let mut execution_units = Vec::new();
        for route_unit in route_context.route_units() {
            for sql_unit in rewriter.rewrite(route_unit) {
                execution_units.push(ExecutionUnit::new(route_unit.data_source_name(), sql_unit));
            }
        }
        Self {
            route_context,
            execution_units,
        }
    }

    /// Context over units produced elsewhere
    pub fn from_units(route_context: RouteContext, execution_units: Vec<ExecutionUnit>) -> Self {
        Self {
            route_context,
            execution_units,
        }
    }

    pub fn route_context(&self) -> &RouteContext {
        &self.route_context
    }

    pub fn execution_units(&self) -> &[ExecutionUnit] {
        &self.execution_units
    }

    /// Units grouped by data source, in first-appearance order.
    pub fn units_by_data_source(&self) -> Vec<(&str, Vec<&SqlUnit>)> {
        let mut grouped: Vec<(&str, Vec<&SqlUnit>)> = Vec::new();
        for unit in &self.execution_units {
            let ds = unit.data_source_name.as_str();
            match grouped.iter_mut().find(|(name, _)| *name == ds) {
                Some((_, units)) => units.push(&unit.sql_unit),
                None => grouped.push((ds, vec![&unit.sql_unit])),
            }
        }
        grouped
    }
}
