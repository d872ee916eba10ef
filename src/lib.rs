//! aeroshard - routing and execution core for a sharded SQL middleware
//!
//! - `rule`: sharding rule model and algorithms
//! - `route`: statement shape to route units
//! - `executor`: partitioning and parallel execution of route units
//! - `lock`: named wait/notify points for coordinated operations
//! - `observability`: structured logging and counters

pub mod executor;
pub mod lock;
pub mod observability;
pub mod route;
pub mod rule;
