//! No-op marker tasks delimiting the load graph.

use async_trait::async_trait;

use crate::context::RunContext;
use crate::error::TaskError;
use crate::result::TaskResult;
use crate::task::Task;

/// A no-op node marking a graph boundary.
///
/// The terminal marker doubles as the run's completion marker: it executes
/// only once every upstream node has succeeded.
pub struct MarkerTask {
    name: String,
}

impl MarkerTask {
    /// Create a new marker task.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Task for MarkerTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &RunContext) -> Result<TaskResult, TaskError> {
        tracing::info!(marker = %self.name, "Marker reached");
        Ok(TaskResult::success())
    }
}
