//! Application configuration for the pipeline binary.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// Environment variables are prefixed with `STARLOAD_`:
/// - `STARLOAD_MAX_CONCURRENT`: parallel task limit (default: 4)
/// - `STARLOAD_DEBUG`: enable debug mode (default: false)
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Maximum number of tasks running at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Enable debug mode.
    #[serde(default)]
    pub debug: bool,
}

fn default_max_concurrent() -> usize {
    4
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("STARLOAD_").from_env::<AppConfig>()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            debug: false,
        }
    }
}
