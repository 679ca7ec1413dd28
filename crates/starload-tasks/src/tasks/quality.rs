//! Data quality checks run after all loads complete.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::RunContext;
use crate::error::TaskError;
use crate::result::TaskResult;
use crate::task::Task;
use crate::warehouse;

/// A single table's post-load assertions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCheck {
    /// Table to validate.
    pub table: String,

    /// Key column that must contain no NULLs. When absent only the row-count
    /// assertion runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_column: Option<String>,
}

impl TableCheck {
    /// Create a check with a designated key column.
    pub fn new(table: impl Into<String>, key_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key_column: Some(key_column.into()),
        }
    }

    /// Create a row-count-only check.
    pub fn row_count_only(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key_column: None,
        }
    }

    fn count_statement(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.table)
    }

    fn null_key_statement(&self, key_column: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM {} WHERE {} IS NULL",
            self.table, key_column
        )
    }
}

/// Runs validation assertions across the configured tables.
///
/// Tables are checked in order; the first failing assertion aborts the task
/// with the failing table and check identified. There is no partial-success
/// mode.
pub struct DataQualityTask {
    name: String,
    checks: Vec<TableCheck>,
}

impl DataQualityTask {
    /// Create a new quality check task.
    pub fn new(name: impl Into<String>, checks: Vec<TableCheck>) -> Self {
        Self {
            name: name.into(),
            checks,
        }
    }

    /// The configured table checks, in execution order.
    pub fn checks(&self) -> &[TableCheck] {
        &self.checks
    }
}

#[async_trait]
impl Task for DataQualityTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &RunContext) -> Result<TaskResult, TaskError> {
        let start = Instant::now();

        let client = warehouse::checkout(&ctx.warehouse).await?;

        for check in &self.checks {
            let count = warehouse::query_count(&client, &check.count_statement()).await?;
            if count < 1 {
                return Err(TaskError::QualityCheck {
                    table: check.table.clone(),
                    check: "row_count".to_string(),
                });
            }

            if let Some(key_column) = &check.key_column {
                let nulls = warehouse::query_count(
                    &client,
                    &check.null_key_statement(key_column),
                )
                .await?;
                if nulls > 0 {
                    return Err(TaskError::QualityCheck {
                        table: check.table.clone(),
                        check: "null_key".to_string(),
                    });
                }
            }

            tracing::info!(table = %check.table, rows = count, "Quality checks passed");
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            tables = self.checks.len(),
            duration_ms,
            "All quality checks passed"
        );

        Ok(TaskResult::success()
            .with_data(serde_json::json!({ "tables_checked": self.checks.len() }))
            .with_duration(duration_ms))
    }
}
