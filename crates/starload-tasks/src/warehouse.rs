//! Warehouse connection pool and statement helpers.

use deadpool_postgres::{Client, Config, Pool, PoolConfig, Runtime};
use serde::Deserialize;
use tokio_postgres::error::SqlState;
use tokio_postgres::NoTls;

use crate::error::TaskError;

/// Warehouse connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseConfig {
    /// Warehouse host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Warehouse port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    #[serde(default = "default_dbname")]
    pub dbname: String,

    /// Username.
    #[serde(default = "default_user")]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Maximum pool size; one connection is checked out per running task.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5439
}

fn default_dbname() -> String {
    "warehouse".to_string()
}

fn default_user() -> String {
    "warehouse".to_string()
}

fn default_pool_size() -> usize {
    8
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dbname: default_dbname(),
            user: default_user(),
            password: String::new(),
            pool_size: default_pool_size(),
        }
    }
}

impl WarehouseConfig {
    /// Build the connection string for this configuration.
    pub fn connection_string(&self) -> String {
        if self.password.is_empty() {
            format!(
                "postgresql://{}@{}:{}/{}",
                self.user, self.host, self.port, self.dbname
            )
        } else {
            format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.dbname
            )
        }
    }

    /// Create a connection pool. Connections are established lazily on first
    /// checkout.
    pub fn create_pool(&self) -> Result<Pool, TaskError> {
        let mut config = Config::new();
        config.url = Some(self.connection_string());
        config.pool = Some(PoolConfig::new(self.pool_size));

        config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| TaskError::Transport(format!("Failed to create warehouse pool: {}", e)))
    }
}

/// Check a client out of the pool.
pub async fn checkout(pool: &Pool) -> Result<Client, TaskError> {
    pool.get().await.map_err(TaskError::from)
}

/// Execute a statement and return the number of rows affected.
pub async fn execute(client: &Client, sql: &str) -> Result<u64, TaskError> {
    client.execute(sql, &[]).await.map_err(map_db_error)
}

/// Run a single-row, single-column count query.
pub async fn query_count(client: &Client, sql: &str) -> Result<i64, TaskError> {
    let row = client.query_one(sql, &[]).await.map_err(map_db_error)?;
    row.try_get::<_, i64>(0).map_err(map_db_error)
}

/// Map a driver error into the task error taxonomy.
///
/// Errors without a database payload come from the connection itself and are
/// transport failures; undefined-relation class errors indicate the target
/// table does not match what the load expects.
pub(crate) fn map_db_error(e: tokio_postgres::Error) -> TaskError {
    match e.as_db_error() {
        None => TaskError::Transport(e.to_string()),
        Some(db) => {
            let code = db.code();
            if code == &SqlState::UNDEFINED_TABLE
                || code == &SqlState::UNDEFINED_COLUMN
                || code == &SqlState::DATATYPE_MISMATCH
            {
                TaskError::Schema(db.message().to_string())
            } else {
                TaskError::Query(db.message().to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WarehouseConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5439);
        assert_eq!(config.pool_size, 8);
    }

    #[test]
    fn test_connection_string_without_password() {
        let config = WarehouseConfig::default();
        assert_eq!(
            config.connection_string(),
            "postgresql://warehouse@localhost:5439/warehouse"
        );
    }

    #[test]
    fn test_connection_string_with_password() {
        let config = WarehouseConfig {
            password: "hunter2".to_string(),
            ..WarehouseConfig::default()
        };
        assert!(config.connection_string().contains("warehouse:hunter2@"));
    }

    #[test]
    fn test_create_pool_is_lazy() {
        // No warehouse is listening here; pool creation must still succeed.
        let pool = WarehouseConfig::default().create_pool();
        assert!(pool.is_ok());
    }

    #[test]
    fn test_config_deserialization() {
        let config: WarehouseConfig = serde_json::from_value(serde_json::json!({
            "host": "redshift.internal",
            "port": 5439,
            "dbname": "analytics",
            "user": "loader"
        }))
        .unwrap();
        assert_eq!(config.host, "redshift.internal");
        assert_eq!(config.dbname, "analytics");
        assert!(config.password.is_empty());
    }
}
