//! Executor configuration

use serde::{Deserialize, Serialize};

use super::errors::{ExecutionError, ExecutionResult};

fn default_max_connections_size_per_query() -> usize {
    1
}

/// Executor settings for one logical database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Connections one query may hold per data source.
    #[serde(default = "default_max_connections_size_per_query")]
    pub max_connections_size_per_query: usize,
    /// Worker threads per execution; 0 uses the available parallelism.
    #[serde(default)]
    pub kernel_executor_size: usize,
    /// Run every group on the calling thread.
    #[serde(default)]
    pub serial_execution: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_connections_size_per_query: default_max_connections_size_per_query(),
            kernel_executor_size: 0,
            serial_execution: false,
        }
    }
}

impl ExecutorConfig {
    /// Serial execution, as used inside local transactions.
    pub fn serial() -> Self {
        Self {
            serial_execution: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ExecutionResult<()> {
        if self.max_connections_size_per_query == 0 {
            return Err(ExecutionError::InvalidConfig(
                "max_connections_size_per_query must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Worker thread count after resolving 0.
    pub fn worker_count(&self) -> usize {
        if self.kernel_executor_size > 0 {
            return self.kernel_executor_size;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}
