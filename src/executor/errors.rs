//! Execution error types
//!
//! Error codes:
//! - SHARD_EXEC_CONNECTION_ACQUIRE (resource, aborts preparation)
//! - SHARD_EXEC_INSUFFICIENT_CONNECTIONS (resource, aborts preparation)
//! - SHARD_EXEC_STORAGE (unit failure, subject to the exception policy)
//! - SHARD_EXEC_INTERRUPTED (call cancelled by its interrupt handle)
//! - SHARD_EXEC_WORKER_PANICKED (a worker thread panicked)
//! - SHARD_EXEC_INVALID_CONFIG / SHARD_EXEC_INTERNAL

use thiserror::Error;

/// Failure reported by a physical data source or connection provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{data_source}] {message}")]
pub struct StorageError {
    pub data_source: String,
    pub message: String,
    /// Vendor SQL state, when the driver reports one
    pub sql_state: Option<String>,
}

impl StorageError {
    pub fn new(data_source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            message: message.into(),
            sql_state: None,
        }
    }

    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }
}

/// Result type for preparation and execution
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Execution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Failed to acquire connection for data source '{data_source}': {message}")]
    ConnectionAcquire { data_source: String, message: String },

    #[error("Data source '{data_source}' supplied {acquired} of {requested} requested connections")]
    InsufficientConnections {
        data_source: String,
        requested: usize,
        acquired: usize,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Execution interrupted")]
    Interrupted,

    #[error("Worker executing group {group} panicked")]
    WorkerPanicked { group: usize },

    #[error("Invalid executor configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal execution error: {0}")]
    Internal(String),
}

impl ExecutionError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutionError::ConnectionAcquire { .. } => "SHARD_EXEC_CONNECTION_ACQUIRE",
            ExecutionError::InsufficientConnections { .. } => "SHARD_EXEC_INSUFFICIENT_CONNECTIONS",
            ExecutionError::Storage(_) => "SHARD_EXEC_STORAGE",
            ExecutionError::Interrupted => "SHARD_EXEC_INTERRUPTED",
            ExecutionError::WorkerPanicked { .. } => "SHARD_EXEC_WORKER_PANICKED",
            ExecutionError::InvalidConfig(_) => "SHARD_EXEC_INVALID_CONFIG",
            ExecutionError::Internal(_) => "SHARD_EXEC_INTERNAL",
        }
    }

    /// Connection acquisition problems
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            ExecutionError::ConnectionAcquire { .. } | ExecutionError::InsufficientConnections { .. }
        )
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, ExecutionError::Interrupted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::new("ds_0", "table missing").with_sql_state("42S02");
        assert_eq!(err.to_string(), "[ds_0] table missing");
        let wrapped: ExecutionError = err.into();
        assert_eq!(wrapped.code(), "SHARD_EXEC_STORAGE");
        assert!(!wrapped.is_resource());
    }

    #[test]
    fn test_classification() {
        let err = ExecutionError::InsufficientConnections {
            data_source: "ds_1".into(),
            requested: 2,
            acquired: 1,
        };
        assert!(err.is_resource());
        assert!(err.to_string().contains("1 of 2"));
        assert!(ExecutionError::Interrupted.is_interrupted());
        assert_eq!(
            ExecutionError::WorkerPanicked { group: 3 }.code(),
            "SHARD_EXEC_WORKER_PANICKED"
        );
    }
}
