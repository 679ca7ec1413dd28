//! Task execution error types.

use thiserror::Error;

/// Errors that can occur during task execution.
///
/// Every variant aborts the current task; retry policy lives entirely in the
/// external scheduler that drives the pipeline.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Source or destination unreachable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Target table missing or incompatible with the incoming data.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Malformed or failing SQL statement.
    #[error("Query error: {0}")]
    Query(String),

    /// Post-load assertion failed.
    #[error("Quality check '{check}' failed for table '{table}'")]
    QualityCheck { table: String, check: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TaskError {
    fn from(e: std::io::Error) -> Self {
        TaskError::Io(e.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for TaskError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        TaskError::Transport(format!("Failed to get warehouse connection: {}", e))
    }
}

impl From<object_store::Error> for TaskError {
    fn from(e: object_store::Error) -> Self {
        TaskError::Transport(e.to_string())
    }
}

impl From<tokio_postgres::Error> for TaskError {
    fn from(e: tokio_postgres::Error) -> Self {
        crate::warehouse::map_db_error(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TaskError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Transport error: connection refused");

        let err = TaskError::QualityCheck {
            table: "users".to_string(),
            check: "row_count".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Quality check 'row_count' failed for table 'users'"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let task_err: TaskError = io_err.into();
        assert!(matches!(task_err, TaskError::Io(_)));
    }
}
