//! Node and run state for graph execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State of a single graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Node has not started yet.
    Pending,
    /// Node is executing.
    Running,
    /// Node completed successfully.
    Succeeded,
    /// Node failed.
    Failed,
    /// Node never ran because an upstream node failed.
    Skipped,
}

impl NodeState {
    /// Returns true once the node can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeState::Succeeded | NodeState::Failed | NodeState::Skipped
        )
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Overall status of a graph run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every node succeeded.
    Succeeded,
    /// At least one node failed or never ran.
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Record of one node's execution within a run.
#[derive(Debug, Clone, Serialize)]
pub struct NodeRecord {
    pub name: String,
    pub state: NodeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl NodeRecord {
    /// Create a new pending record.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: NodeState::Pending,
            rows_affected: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Report produced by a completed graph run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub nodes: Vec<NodeRecord>,
    /// Name of the first node to fail, when any did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_failure: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Returns true if every node succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Succeeded)
    }

    /// Look up a node record by name.
    pub fn node(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.name == name)
    }
}
