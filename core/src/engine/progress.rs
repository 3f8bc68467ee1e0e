use serde::Serialize;

use crate::engine::report::{ExecutionMetrics, NodeStatus};

/// Observer of run progress (streaming UIs, JSONL sinks, tests).
///
/// Called from concurrent node tasks; implementations must be
/// thread-safe and should return quickly.
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// Progress events emitted over the course of one run.
///
/// Serializes with a `type` tag so callers can forward events as JSON
/// lines without translation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    RunStarted {
        run_id: String,
        goal: String,
        total_nodes: usize,
        total_batches: usize,
        timestamp: i64,
    },
    BatchStarted {
        run_id: String,
        batch: usize,
        total_batches: usize,
        size: usize,
        completed_nodes: usize,
        total_nodes: usize,
        timestamp: i64,
    },
    NodeStarted {
        run_id: String,
        node_id: String,
        description: String,
        batch: usize,
        timestamp: i64,
    },
    NodeFinished {
        run_id: String,
        node_id: String,
        status: NodeStatus,
        metrics: ExecutionMetrics,
        timestamp: i64,
    },
    NodeFailed {
        run_id: String,
        node_id: String,
        message: String,
        timestamp: i64,
    },
    BatchFinished {
        run_id: String,
        batch: usize,
        completed_nodes: usize,
        total_nodes: usize,
        timestamp: i64,
    },
    RunFinished {
        run_id: String,
        duration_ms: u64,
        total_cost: f64,
        timestamp: i64,
    },
    RunFailed {
        run_id: String,
        node_id: Option<String>,
        message: String,
        timestamp: i64,
    },
}

impl ProgressEvent {
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::BatchStarted { run_id, .. }
            | Self::NodeStarted { run_id, .. }
            | Self::NodeFinished { run_id, .. }
            | Self::NodeFailed { run_id, .. }
            | Self::BatchFinished { run_id, .. }
            | Self::RunFinished { run_id, .. }
            | Self::RunFailed { run_id, .. } => run_id,
        }
    }
}

/// Unix milliseconds, the timestamp unit used across events.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = ProgressEvent::NodeStarted {
            run_id: "run-1".to_string(),
            node_id: "extract".to_string(),
            description: "Extract themes".to_string(),
            batch: 0,
            timestamp: 1,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "node_started");
        assert_eq!(value["node_id"], "extract");
        assert_eq!(value["batch"], 0);
    }

    #[test]
    fn test_run_id_accessor() {
        let event = ProgressEvent::RunFailed {
            run_id: "run-9".to_string(),
            node_id: None,
            message: "boom".to_string(),
            timestamp: 2,
        };
        assert_eq!(event.run_id(), "run-9");
    }
}
