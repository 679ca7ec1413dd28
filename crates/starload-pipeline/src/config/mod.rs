//! Environment-driven configuration.

pub mod app;
pub mod staging;

pub use app::AppConfig;
pub use staging::StagingConfig;

use starload_tasks::warehouse::WarehouseConfig;

use crate::error::PipelineError;

/// Load the warehouse configuration from `STARLOAD_WAREHOUSE_`-prefixed
/// environment variables.
pub fn warehouse_from_env() -> Result<WarehouseConfig, PipelineError> {
    envy::prefixed("STARLOAD_WAREHOUSE_")
        .from_env::<WarehouseConfig>()
        .map_err(PipelineError::from)
}
