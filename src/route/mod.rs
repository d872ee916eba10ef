//! Routing engine
//!
//! Pure function of (statement shape, sharding rule, hint context) to a
//! [`RouteContext`]. No I/O.
//!
//! # Strategies
//!
//! 1. Hint: a hint data source wins over every shape
//! 2. Standard / complex: two-level database then table narrowing
//! 3. Unicast: exactly one target, random among equally valid data sources
//! 4. Broadcast: every data source, or every actual data node for DDL
//! 5. Join: each table routed on its own, combined per shared data source
//!
//! Multiple data nodes matching a predicate are always all included; only
//! unicast narrows.

mod broadcast;
mod cartesian;
mod context;
mod engine;
mod errors;
mod shape;
mod standard;
mod unicast;

pub use context::{RouteContext, RouteMapper, RouteUnit};
pub use engine::RoutingEngine;
pub use errors::{RouteError, RouteResult};
pub use shape::{HintContext, ShardingCondition, ShardingTarget, StatementShape};
