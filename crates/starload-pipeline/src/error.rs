//! Pipeline error types.

use thiserror::Error;

/// Errors produced by graph construction and configuration loading.
///
/// Task execution failures do not surface here: the runner records them in
/// the run report so the whole graph outcome stays observable.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Graph construction or validation error.
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using PipelineError.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl From<envy::Error> for PipelineError {
    fn from(err: envy::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_graph_display() {
        let err = PipelineError::InvalidGraph("cycle detected".to_string());
        assert_eq!(err.to_string(), "Invalid graph: cycle detected");
    }

    #[test]
    fn test_config_display() {
        let err = PipelineError::Config("missing bucket".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing bucket");
    }
}
