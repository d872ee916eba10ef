//! Execution subsystem
//!
//! Turns a route context into physical statement executions.
//!
//! # Flow
//!
//! 1. [`ExecutionContext::build`] rewrites each route unit into SQL units
//! 2. [`ExecutionPrepareEngine`] groups units by data source, acquires
//!    connections and partitions units into connection-sharing groups
//! 3. [`ExecutorEngine`] runs the groups through an [`ExecutorCallback`],
//!    first group on the calling (trunk) thread, the rest on workers
//! 4. [`StorageCallback`] applies sane-result substitution and the
//!    per-call [`ExceptionPolicy`] to unit failures
//!
//! Results come back in group submission order.

mod callback;
mod config;
mod context;
mod engine;
mod errors;
mod partition;
mod policy;
mod scope;
mod unit;

pub use callback::{DatabaseType, ExecutorCallback, StorageCallback, StorageExecutor};
pub use config::ExecutorConfig;
pub use context::{ExecutionContext, RouteUnitRewriter};
pub use engine::ExecutorEngine;
pub use errors::{ExecutionError, ExecutionResult, StorageError};
pub use partition::{partition, partition_size, ConnectionProvider, ExecutionGroupContext, ExecutionPrepareEngine};
pub use policy::ExceptionPolicy;
pub use scope::{ExecutionScope, InterruptHandle};
pub use unit::{ConnectionMode, ExecutionUnit, InputGroup, SqlUnit, StatementExecuteUnit};
