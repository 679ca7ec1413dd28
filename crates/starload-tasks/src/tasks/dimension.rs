//! Dimension loader: replace or append a dimension table from a transform
//! query.

use std::time::Instant;

use async_trait::async_trait;

use crate::context::RunContext;
use crate::error::TaskError;
use crate::result::TaskResult;
use crate::task::Task;
use crate::warehouse::{self, map_db_error};

/// Repopulates a dimension table from a transform query.
///
/// In replace mode (the default) all prior rows are deleted first; delete and
/// insert commit in a single transaction, so the table is never observable in
/// an empty intermediate state. In append-only mode the delete is skipped and
/// rows accumulate across runs.
pub struct LoadDimensionTask {
    name: String,
    /// Target dimension table.
    pub table: String,
    /// Transform query producing the dimension rows.
    pub sql_query: String,
    /// Skip the pre-load delete.
    pub is_append_only: bool,
}

impl LoadDimensionTask {
    /// Create a new dimension load task.
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        sql_query: impl Into<String>,
        is_append_only: bool,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            sql_query: sql_query.into(),
            is_append_only,
        }
    }

    /// Build the delete statement for replace mode.
    fn delete_statement(&self) -> String {
        format!("DELETE FROM {}", self.table)
    }

    /// Build the insert statement.
    fn insert_statement(&self) -> String {
        format!("INSERT INTO {} {}", self.table, self.sql_query.trim())
    }
}

#[async_trait]
impl Task for LoadDimensionTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &RunContext) -> Result<TaskResult, TaskError> {
        let start = Instant::now();

        let rows = if self.is_append_only {
            let client = warehouse::checkout(&ctx.warehouse).await?;
            tracing::info!(table = %self.table, "Appending into dimension table");
            warehouse::execute(&client, &self.insert_statement()).await?
        } else {
            let mut client = warehouse::checkout(&ctx.warehouse).await?;
            let tx = client.transaction().await.map_err(map_db_error)?;

            tracing::info!(table = %self.table, "Deleting dimension table contents");
            tx.execute(self.delete_statement().as_str(), &[])
                .await
                .map_err(map_db_error)?;

            tracing::info!(table = %self.table, "Inserting into dimension table");
            let rows = tx
                .execute(self.insert_statement().as_str(), &[])
                .await
                .map_err(map_db_error)?;

            tx.commit().await.map_err(map_db_error)?;
            rows
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(table = %self.table, rows, duration_ms, "Dimension table loaded");

        Ok(TaskResult::success()
            .with_rows(rows)
            .with_duration(duration_ms))
    }
}
