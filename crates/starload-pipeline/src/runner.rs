//! Concurrent graph execution.

use std::sync::Arc;

use chrono::Utc;
use starload_tasks::{RunContext, TaskError, TaskResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::PipelineError;
use crate::graph::state::{NodeRecord, NodeState, RunReport, RunStatus};
use crate::graph::TaskGraph;

/// Executes a task graph.
///
/// A node enters Running only once all its upstream nodes have succeeded.
/// Nodes with no ordering between them run concurrently, bounded by
/// `max_concurrent`. When a node fails, every node downstream of it is
/// skipped and the run is marked failed; already-running sibling nodes are
/// left to finish.
pub struct GraphRunner {
    max_concurrent: usize,
}

impl GraphRunner {
    /// Create a runner with the given parallel task limit.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Run the graph to completion and report every node's outcome.
    pub async fn run(
        &self,
        graph: &TaskGraph,
        ctx: &RunContext,
    ) -> Result<RunReport, PipelineError> {
        graph.validate()?;

        let started_at = Utc::now();
        let node_count = graph.node_count();
        let mut states = vec![NodeState::Pending; node_count];
        let mut records: Vec<NodeRecord> = graph
            .node_ids()
            .map(|id| NodeRecord::new(graph.node_name(id)))
            .collect();
        let mut first_failure: Option<String> = None;

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut running: JoinSet<(usize, Result<TaskResult, TaskError>)> = JoinSet::new();

        loop {
            skip_blocked(graph, &mut states, &mut records);
            spawn_ready(graph, ctx, &semaphore, &mut states, &mut records, &mut running);

            let Some(joined) = running.join_next().await else {
                break;
            };

            match joined {
                Ok((idx, result)) => {
                    records[idx].finished_at = Some(Utc::now());
                    match result {
                        Ok(task_result) => {
                            states[idx] = NodeState::Succeeded;
                            records[idx].state = NodeState::Succeeded;
                            records[idx].rows_affected = task_result.rows_affected;
                            tracing::info!(
                                node = %records[idx].name,
                                rows = ?task_result.rows_affected,
                                "Node succeeded"
                            );
                        }
                        Err(e) => {
                            states[idx] = NodeState::Failed;
                            records[idx].state = NodeState::Failed;
                            records[idx].error = Some(e.to_string());
                            if first_failure.is_none() {
                                first_failure = Some(records[idx].name.clone());
                            }
                            tracing::error!(
                                node = %records[idx].name,
                                error = %e,
                                "Node failed"
                            );
                        }
                    }
                }
                Err(join_err) => {
                    // The task never reported back; its node stays Running
                    // and is settled below.
                    tracing::error!(error = %join_err, "Task aborted before reporting");
                }
            }
        }

        for idx in 0..node_count {
            match states[idx] {
                NodeState::Running => {
                    states[idx] = NodeState::Failed;
                    records[idx].state = NodeState::Failed;
                    records[idx].error = Some("task aborted before reporting".to_string());
                    if first_failure.is_none() {
                        first_failure = Some(records[idx].name.clone());
                    }
                }
                NodeState::Pending => {
                    states[idx] = NodeState::Skipped;
                    records[idx].state = NodeState::Skipped;
                }
                _ => {}
            }
        }

        let status = if states.iter().all(|s| *s == NodeState::Succeeded) {
            RunStatus::Succeeded
        } else {
            RunStatus::Failed
        };

        let report = RunReport {
            run_id: ctx.run_id,
            status,
            nodes: records,
            first_failure,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            run_id = %report.run_id,
            status = %report.status,
            nodes = report.nodes.len(),
            "Run finished"
        );

        Ok(report)
    }
}

/// Mark every pending node with a failed or skipped upstream as skipped.
fn skip_blocked(graph: &TaskGraph, states: &mut [NodeState], records: &mut [NodeRecord]) {
    loop {
        let mut changed = false;
        for id in graph.node_ids() {
            if states[id.0] != NodeState::Pending {
                continue;
            }
            let blocked = graph.upstream(id).iter().any(|upstream| {
                matches!(
                    states[upstream.0],
                    NodeState::Failed | NodeState::Skipped
                )
            });
            if blocked {
                states[id.0] = NodeState::Skipped;
                records[id.0].state = NodeState::Skipped;
                tracing::warn!(node = %records[id.0].name, "Node skipped: upstream failed");
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Spawn every pending node whose upstream nodes have all succeeded.
fn spawn_ready(
    graph: &TaskGraph,
    ctx: &RunContext,
    semaphore: &Arc<Semaphore>,
    states: &mut [NodeState],
    records: &mut [NodeRecord],
    running: &mut JoinSet<(usize, Result<TaskResult, TaskError>)>,
) {
    for id in graph.node_ids() {
        if states[id.0] != NodeState::Pending {
            continue;
        }
        let ready = graph
            .upstream(id)
            .iter()
            .all(|upstream| states[upstream.0] == NodeState::Succeeded);
        if !ready {
            continue;
        }

        states[id.0] = NodeState::Running;
        records[id.0].state = NodeState::Running;
        records[id.0].started_at = Some(Utc::now());
        tracing::info!(node = %records[id.0].name, "Node started");

        let task = graph.task(id);
        let ctx = ctx.clone();
        let semaphore = Arc::clone(semaphore);
        let idx = id.0;
        running.spawn(async move {
            let permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return (idx, Err(TaskError::Io(e.to_string()))),
            };
            let result = task.execute(&ctx).await;
            drop(permit);
            (idx, result)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use starload_tasks::warehouse::WarehouseConfig;
    use starload_tasks::Task;

    type EventLog = Arc<Mutex<Vec<String>>>;

    /// Test task that records start/done events into a shared log.
    struct RecordingTask {
        name: String,
        log: EventLog,
        fail: bool,
        delay_ms: u64,
    }

    impl RecordingTask {
        fn new(name: &str, log: &EventLog) -> Self {
            Self {
                name: name.to_string(),
                log: Arc::clone(log),
                fail: false,
                delay_ms: 0,
            }
        }

        fn failing(name: &str, log: &EventLog) -> Self {
            Self {
                fail: true,
                ..Self::new(name, log)
            }
        }

        fn with_delay(mut self, delay_ms: u64) -> Self {
            self.delay_ms = delay_ms;
            self
        }
    }

    #[async_trait]
    impl Task for RecordingTask {
        fn name(&self) -> &str {
            &self.name
        }

        async fn execute(&self, _ctx: &RunContext) -> Result<TaskResult, TaskError> {
            self.log.lock().unwrap().push(format!("start:{}", self.name));
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            self.log.lock().unwrap().push(format!("done:{}", self.name));
            if self.fail {
                Err(TaskError::Query(format!("{} exploded", self.name)))
            } else {
                Ok(TaskResult::success().with_rows(1))
            }
        }
    }

    fn make_ctx() -> RunContext {
        let pool = WarehouseConfig::default().create_pool().unwrap();
        RunContext::new(pool)
    }

    fn event_position(log: &[String], event: &str) -> usize {
        log.iter().position(|e| e == event).unwrap()
    }

    #[tokio::test]
    async fn test_linear_graph_runs_in_order() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut graph = TaskGraph::new();
        let a = graph.add_node(Arc::new(RecordingTask::new("a", &log)));
        let b = graph.add_node(Arc::new(RecordingTask::new("b", &log)));
        let c = graph.add_node(Arc::new(RecordingTask::new("c", &log)));
        graph.add_edge(a, b);
        graph.add_edge(b, c);

        let report = GraphRunner::new(4).run(&graph, &make_ctx()).await.unwrap();

        assert!(report.is_success());
        let events = log.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["start:a", "done:a", "start:b", "done:b", "start:c", "done:c"]
        );
    }

    #[tokio::test]
    async fn test_fact_waits_for_both_staging_nodes() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut graph = TaskGraph::new();
        let slow = graph.add_node(Arc::new(
            RecordingTask::new("stage_events", &log).with_delay(50),
        ));
        let fast = graph.add_node(Arc::new(
            RecordingTask::new("stage_songs", &log).with_delay(5),
        ));
        let fact = graph.add_node(Arc::new(RecordingTask::new("load_fact", &log)));
        graph.add_fan(&[slow, fast], &[fact]);

        let report = GraphRunner::new(4).run(&graph, &make_ctx()).await.unwrap();

        assert!(report.is_success());
        let events = log.lock().unwrap().clone();
        let fact_start = event_position(&events, "start:load_fact");
        assert!(fact_start > event_position(&events, "done:stage_events"));
        assert!(fact_start > event_position(&events, "done:stage_songs"));
    }

    #[tokio::test]
    async fn test_failure_skips_downstream() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut graph = TaskGraph::new();
        let stage = graph.add_node(Arc::new(RecordingTask::new("stage", &log)));
        let dim = graph.add_node(Arc::new(RecordingTask::failing("load_dim", &log)));
        let quality = graph.add_node(Arc::new(RecordingTask::new("quality", &log)));
        let finish = graph.add_node(Arc::new(RecordingTask::new("finish", &log)));
        graph.add_edge(stage, dim);
        graph.add_edge(dim, quality);
        graph.add_edge(quality, finish);

        let report = GraphRunner::new(4).run(&graph, &make_ctx()).await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.first_failure.as_deref(), Some("load_dim"));
        assert_eq!(report.node("load_dim").unwrap().state, NodeState::Failed);
        assert_eq!(report.node("quality").unwrap().state, NodeState::Skipped);
        assert_eq!(report.node("finish").unwrap().state, NodeState::Skipped);

        let events = log.lock().unwrap().clone();
        assert!(!events.contains(&"start:quality".to_string()));
    }

    #[tokio::test]
    async fn test_running_sibling_finishes_after_failure() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut graph = TaskGraph::new();
        let failing = graph.add_node(Arc::new(RecordingTask::failing("fast_fail", &log)));
        let slow = graph.add_node(Arc::new(
            RecordingTask::new("slow_sibling", &log).with_delay(50),
        ));
        let joined = graph.add_node(Arc::new(RecordingTask::new("joined", &log)));
        graph.add_fan(&[failing, slow], &[joined]);

        let report = GraphRunner::new(4).run(&graph, &make_ctx()).await.unwrap();

        assert!(!report.is_success());
        assert_eq!(
            report.node("slow_sibling").unwrap().state,
            NodeState::Succeeded
        );
        assert_eq!(report.node("joined").unwrap().state, NodeState::Skipped);

        let events = log.lock().unwrap().clone();
        assert!(events.contains(&"done:slow_sibling".to_string()));
    }

    #[tokio::test]
    async fn test_parallel_nodes_overlap() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut graph = TaskGraph::new();
        let a = graph.add_node(Arc::new(RecordingTask::new("a", &log).with_delay(30)));
        let b = graph.add_node(Arc::new(RecordingTask::new("b", &log).with_delay(30)));
        let joined = graph.add_node(Arc::new(RecordingTask::new("joined", &log)));
        graph.add_fan(&[a, b], &[joined]);

        let report = GraphRunner::new(4).run(&graph, &make_ctx()).await.unwrap();

        assert!(report.is_success());
        let events = log.lock().unwrap().clone();
        // Both parallel nodes start before either finishes.
        let first_done = events.iter().position(|e| e.starts_with("done:")).unwrap();
        assert!(event_position(&events, "start:a") < first_done);
        assert!(event_position(&events, "start:b") < first_done);
    }

    #[tokio::test]
    async fn test_run_records_rows_and_timings() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut graph = TaskGraph::new();
        graph.add_node(Arc::new(RecordingTask::new("only", &log)));

        let report = GraphRunner::new(1).run(&graph, &make_ctx()).await.unwrap();

        let record = report.node("only").unwrap();
        assert_eq!(record.rows_affected, Some(1));
        assert!(record.started_at.is_some());
        assert!(record.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_empty_graph_succeeds() {
        let graph = TaskGraph::new();
        let report = GraphRunner::new(4).run(&graph, &make_ctx()).await.unwrap();
        assert!(report.is_success());
        assert!(report.nodes.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_graph_is_rejected() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut graph = TaskGraph::new();
        let a = graph.add_node(Arc::new(RecordingTask::new("a", &log)));
        let b = graph.add_node(Arc::new(RecordingTask::new("b", &log)));
        graph.add_edge(a, b);
        graph.add_edge(b, a);

        let result = GraphRunner::new(4).run(&graph, &make_ctx()).await;
        assert!(matches!(result, Err(PipelineError::InvalidGraph(_))));
        assert!(log.lock().unwrap().is_empty());
    }
}
