//! Staging loader: bulk copy from object storage into a staging table.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::{RunContext, StagingCredentials};
use crate::error::TaskError;
use crate::result::TaskResult;
use crate::task::Task;
use crate::warehouse::{self, map_db_error};

/// Record format accepted by the warehouse bulk COPY statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    /// JSON records with automatic field mapping.
    JsonAuto,
    /// JSON records mapped through a JSONPaths file in object storage.
    JsonPaths { jsonpaths: String },
    /// Delimited records.
    Csv { delimiter: char },
}

impl DataFormat {
    /// Render the format clause of the COPY statement.
    pub fn copy_clause(&self) -> String {
        match self {
            DataFormat::JsonAuto => "FORMAT AS JSON 'auto'".to_string(),
            DataFormat::JsonPaths { jsonpaths } => format!("FORMAT AS JSON '{}'", jsonpaths),
            DataFormat::Csv { delimiter } => format!("FORMAT AS CSV DELIMITER '{}'", delimiter),
        }
    }
}

/// Copies all matching source records into a staging table, fully replacing
/// prior contents.
///
/// The delete and the COPY run in one transaction, so a failed run never
/// leaves the staging table half-loaded. The target table must already exist
/// with a compatible schema.
pub struct StageTask {
    name: String,
    /// Target staging table.
    pub table: String,
    /// Source bucket.
    pub s3_bucket: String,
    /// Source key prefix.
    pub s3_key: String,
    /// Record format descriptor.
    pub format: DataFormat,
}

impl StageTask {
    /// Create a new staging task.
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        s3_bucket: impl Into<String>,
        s3_key: impl Into<String>,
        format: DataFormat,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            s3_bucket: s3_bucket.into(),
            s3_key: s3_key.into(),
            format,
        }
    }

    /// Build the COPY statement for this task.
    ///
    /// The credentials land inside the statement text; the statement is never
    /// logged for that reason.
    fn copy_statement(&self, credentials: &StagingCredentials, region: Option<&str>) -> String {
        let mut sql = format!(
            "COPY {} FROM 's3://{}/{}' ACCESS_KEY_ID '{}' SECRET_ACCESS_KEY '{}'",
            self.table,
            self.s3_bucket,
            self.s3_key,
            credentials.access_key_id,
            credentials.secret_access_key,
        );
        if let Some(region) = region {
            sql.push_str(&format!(" REGION '{}'", region));
        }
        sql.push(' ');
        sql.push_str(&self.format.copy_clause());
        sql
    }
}

#[async_trait]
impl Task for StageTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &RunContext) -> Result<TaskResult, TaskError> {
        let start = Instant::now();

        let mut client = warehouse::checkout(&ctx.warehouse).await?;
        let tx = client.transaction().await.map_err(map_db_error)?;

        tracing::info!(table = %self.table, "Clearing staging table");
        tx.execute(format!("DELETE FROM {}", self.table).as_str(), &[])
            .await
            .map_err(map_db_error)?;

        tracing::info!(
            table = %self.table,
            bucket = %self.s3_bucket,
            key = %self.s3_key,
            "Copying source records into staging table"
        );
        let copy_sql =
            self.copy_statement(&ctx.staging_credentials, ctx.staging_region.as_deref());
        let rows = tx
            .execute(copy_sql.as_str(), &[])
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(table = %self.table, rows, duration_ms, "Staging table loaded");

        Ok(TaskResult::success()
            .with_rows(rows)
            .with_duration(duration_ms))
    }
}
