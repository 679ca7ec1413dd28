//! Task trait executed by the pipeline graph runner.

use async_trait::async_trait;

use crate::context::RunContext;
use crate::error::TaskError;
use crate::result::TaskResult;

/// Trait for implementing executable pipeline tasks.
///
/// A task is one node of the load graph. It checks out whatever resources it
/// needs from the [`RunContext`] capabilities, performs its statements, and
/// returns a [`TaskResult`] or aborts with a [`TaskError`]. Tasks never retry
/// internally.
#[async_trait]
pub trait Task: Send + Sync {
    /// Returns the task's name as shown in logs and run reports.
    fn name(&self) -> &str;

    /// Execute the task with the given run context.
    async fn execute(&self, ctx: &RunContext) -> Result<TaskResult, TaskError>;
}
