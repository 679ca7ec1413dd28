//! Explicit task graph construction.

pub mod state;

pub use state::{NodeRecord, NodeState, RunReport, RunStatus};

use std::collections::HashSet;
use std::sync::Arc;

use starload_tasks::Task;

use crate::error::PipelineError;

/// Identifier of a node within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

struct GraphNode {
    name: String,
    task: Arc<dyn Task>,
}

/// A directed acyclic graph of pipeline tasks.
///
/// Nodes and edges are built explicitly with [`TaskGraph::add_node`] and
/// [`TaskGraph::add_edge`]; nothing registers itself into shared ambient
/// state, and the graph value composes like any other.
#[derive(Default)]
pub struct TaskGraph {
    nodes: Vec<GraphNode>,
    edges: HashSet<(NodeId, NodeId)>,
}

impl TaskGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; its name comes from the task itself.
    pub fn add_node(&mut self, task: Arc<dyn Task>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(GraphNode {
            name: task.name().to_string(),
            task,
        });
        id
    }

    /// Add a dependency edge: `downstream` may start only after `upstream`
    /// succeeds. Duplicate edges collapse.
    pub fn add_edge(&mut self, upstream: NodeId, downstream: NodeId) {
        self.edges.insert((upstream, downstream));
    }

    /// Add every edge of the cross product between two node sets.
    pub fn add_fan(&mut self, upstreams: &[NodeId], downstreams: &[NodeId]) {
        for upstream in upstreams {
            for downstream in downstreams {
                self.add_edge(*upstream, *downstream);
            }
        }
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all node ids.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Name of a node.
    pub fn node_name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// The task behind a node.
    pub(crate) fn task(&self, id: NodeId) -> Arc<dyn Task> {
        Arc::clone(&self.nodes[id.0].task)
    }

    /// Direct upstream dependencies of a node.
    pub fn upstream(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .edges
            .iter()
            .filter(|(_, downstream)| *downstream == id)
            .map(|(upstream, _)| *upstream)
            .collect();
        ids.sort_by_key(|n| n.0);
        ids
    }

    /// Direct downstream dependents of a node.
    pub fn downstream(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .edges
            .iter()
            .filter(|(upstream, _)| *upstream == id)
            .map(|(_, downstream)| *downstream)
            .collect();
        ids.sort_by_key(|n| n.0);
        ids
    }

    /// Validate the graph: node names must be unique, edges must reference
    /// nodes of this graph, self-edges are rejected, and the graph must be
    /// acyclic.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(PipelineError::InvalidGraph(format!(
                    "duplicate node name '{}'",
                    node.name
                )));
            }
        }

        for (upstream, downstream) in &self.edges {
            if upstream.0 >= self.nodes.len() || downstream.0 >= self.nodes.len() {
                return Err(PipelineError::InvalidGraph(
                    "edge references a node from another graph".to_string(),
                ));
            }
            if upstream == downstream {
                return Err(PipelineError::InvalidGraph(format!(
                    "self-edge on node '{}'",
                    self.nodes[upstream.0].name
                )));
            }
        }

        self.topological_order().map(|_| ())
    }

    /// Topological order of the nodes, earliest first. Fails when the edge
    /// set contains a cycle.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, PipelineError> {
        let mut in_degree = vec![0usize; self.nodes.len()];
        for (_, downstream) in &self.edges {
            if downstream.0 < in_degree.len() {
                in_degree[downstream.0] += 1;
            }
        }

        let mut ready: Vec<NodeId> = self
            .node_ids()
            .filter(|id| in_degree[id.0] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = ready.pop() {
            order.push(id);
            for downstream in self.downstream(id) {
                in_degree[downstream.0] -= 1;
                if in_degree[downstream.0] == 0 {
                    ready.push(downstream);
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(PipelineError::InvalidGraph(
                "dependency cycle detected".to_string(),
            ));
        }

        Ok(order)
    }
}
