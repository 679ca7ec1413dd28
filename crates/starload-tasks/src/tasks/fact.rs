//! Fact loader: append transform-query output into the fact table.

use std::time::Instant;

use async_trait::async_trait;

use crate::context::RunContext;
use crate::error::TaskError;
use crate::result::TaskResult;
use crate::task::Task;
use crate::warehouse;

/// Appends the rows produced by a transform query into the fact table.
///
/// Existing rows are never deleted. The loader performs no deduplication;
/// idempotence belongs to the transform query itself.
pub struct LoadFactTask {
    name: String,
    /// Target fact table.
    pub table: String,
    /// Transform query producing the fact rows.
    pub sql_query: String,
}

impl LoadFactTask {
    /// Create a new fact load task.
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        sql_query: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            sql_query: sql_query.into(),
        }
    }

    /// Build the append statement for this task.
    fn insert_statement(&self) -> String {
        format!("INSERT INTO {} {}", self.table, self.sql_query.trim())
    }
}

#[async_trait]
impl Task for LoadFactTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &RunContext) -> Result<TaskResult, TaskError> {
        let start = Instant::now();

        let client = warehouse::checkout(&ctx.warehouse).await?;

        tracing::info!(table = %self.table, "Appending rows into fact table");
        let rows = warehouse::execute(&client, &self.insert_statement()).await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(table = %self.table, rows, duration_ms, "Fact table loaded");

        Ok(TaskResult::success()
            .with_rows(rows)
            .with_duration(duration_ms))
    }
}
