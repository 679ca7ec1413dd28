//! Task execution result types.

use serde::{Deserialize, Serialize};

/// Status of a task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task executed successfully.
    Success,
    /// Task execution failed.
    Error,
}

impl TaskStatus {
    /// Returns true if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Error => write!(f, "error"),
        }
    }
}

/// Result of a task execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Execution status.
    pub status: TaskStatus,

    /// Rows written or validated by the task, when the warehouse reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,

    /// Result data (task-specific).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error message if status is Error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Execution duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl TaskResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            status: TaskStatus::Success,
            rows_affected: None,
            data: None,
            error: None,
            duration_ms: None,
        }
    }

    /// Create an error result with message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Error,
            rows_affected: None,
            data: None,
            error: Some(message.into()),
            duration_ms: None,
        }
    }

    /// Set the rows affected by the task.
    pub fn with_rows(mut self, rows: u64) -> Self {
        self.rows_affected = Some(rows);
        self
    }

    /// Set additional data on the result.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the execution duration.
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Returns true if the result indicates success.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_display() {
        assert_eq!(TaskStatus::Success.to_string(), "success");
        assert_eq!(TaskStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_task_result_success() {
        let result = TaskResult::success().with_rows(42);
        assert!(result.is_success());
        assert_eq!(result.rows_affected, Some(42));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_task_result_error() {
        let result = TaskResult::error("something went wrong");
        assert!(!result.is_success());
        assert_eq!(result.error, Some("something went wrong".to_string()));
    }

    #[test]
    fn test_task_result_serialization() {
        let result = TaskResult::success()
            .with_rows(7)
            .with_data(serde_json::json!({"tables_checked": 5}));
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"status\":\"success\""));
        assert!(json.contains("\"rows_affected\":7"));
        assert!(!json.contains("error"));
    }
}
