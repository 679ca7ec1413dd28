//! Run context passed to task executions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use uuid::Uuid;

/// Credentials the warehouse uses to read bulk-load sources from object
/// storage. Carried as a value so tasks never reach into ambient state or a
/// named secret store.
#[derive(Debug, Clone, Default)]
pub struct StagingCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Context passed to tasks during execution.
///
/// Bundles every capability a task may need:
/// - the warehouse connection pool (one client checked out per task)
/// - object storage credentials for COPY statements
/// - run metadata and per-run variables
#[derive(Clone)]
pub struct RunContext {
    /// Unique run ID.
    pub run_id: Uuid,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// Warehouse connection pool.
    pub warehouse: Pool,

    /// Credentials for COPY-from-object-storage statements.
    pub staging_credentials: StagingCredentials,

    /// Region of the staging bucket, when the warehouse needs it spelled out.
    pub staging_region: Option<String>,

    /// Variables available to tasks.
    pub variables: HashMap<String, serde_json::Value>,
}

impl RunContext {
    /// Create a new run context around a warehouse pool.
    pub fn new(warehouse: Pool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            warehouse,
            staging_credentials: StagingCredentials::default(),
            staging_region: None,
            variables: HashMap::new(),
        }
    }

    /// Set the staging credentials.
    pub fn with_staging_credentials(mut self, credentials: StagingCredentials) -> Self {
        self.staging_credentials = credentials;
        self
    }

    /// Set the staging bucket region.
    pub fn with_staging_region(mut self, region: impl Into<String>) -> Self {
        self.staging_region = Some(region.into());
        self
    }

    /// Set a variable value.
    pub fn set_variable(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.variables.insert(name.into(), value);
    }

    /// Get a variable value.
    pub fn get_variable(&self, name: &str) -> Option<&serde_json::Value> {
        self.variables.get(name)
    }
}
