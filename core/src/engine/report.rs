use serde::{Deserialize, Serialize};

use crate::plan::{Artifact, ArtifactMap, Plan};

/// Lifecycle of one node within a run. Terminal states are never
/// re-entered in the same run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cached,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cached)
    }
}

/// Token usage of one node execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

/// Per-node timing, usage and placement collected during a run.
///
/// Cached nodes carry no `tokens_used`/`cost`: a hit adds nothing to
/// the run's spend, even though the underlying artifact still records
/// the usage of the execution that originally produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetrics {
    pub node_id: String,
    /// Unix milliseconds when the node task started.
    pub start_time: i64,
    /// Unix milliseconds when the node task settled.
    pub end_time: i64,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<TokenUsage>,
    /// USD cost of this execution, absent for cache hits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Index of the batch this node ran in.
    pub parallel_batch: usize,
    pub dependencies: Vec<String>,
    pub status: NodeStatus,
}

/// Per-run cache effectiveness counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn new(hits: usize, misses: usize) -> Self {
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };
        Self {
            hits,
            misses,
            hit_rate,
        }
    }
}

/// One node of the renderable execution graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub level: usize,
    pub batch: usize,
    pub duration_ms: u64,
    pub status: NodeStatus,
}

/// One dependency edge of the renderable execution graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// Levels, batches, durations and statuses in a form a frontend can
/// draw directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Everything a successful run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub plan: Plan,
    /// Every artifact produced or reused during the run, keyed by node.
    pub artifacts: ArtifactMap,
    /// The artifact of the plan's final output node.
    pub final_output: Artifact,
    /// Wall-clock duration of the whole run in milliseconds.
    pub duration_ms: u64,
    /// USD spend of this run. Cache hits contribute nothing.
    pub total_cost: f64,
    pub metrics: Vec<ExecutionMetrics>,
    pub parallel_batches: usize,
    pub critical_path: Vec<String>,
    pub caching: CacheStats,
    pub execution_graph: ExecutionGraph,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats::new(3, 1);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.75).abs() < f64::EPSILON);

        let empty = CacheStats::new(0, 0);
        assert_eq!(empty.hit_rate, 0.0);
    }

    #[test]
    fn test_node_status_terminality() {
        assert!(NodeStatus::Completed.is_terminal());
        assert!(NodeStatus::Cached.is_terminal());
        assert!(NodeStatus::Failed.is_terminal());
        assert!(!NodeStatus::Pending.is_terminal());
        assert!(!NodeStatus::Running.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&NodeStatus::Cached).unwrap(), "\"cached\"");
        let status: NodeStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, NodeStatus::Failed);
    }
}
