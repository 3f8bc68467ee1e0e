//! Plan execution engine
//!
//! This module turns a planner-produced task DAG into artifacts. It
//! provides:
//! - Plan graph analysis: dependency levels, parallel batches, cycle
//!   detection and critical-path extraction
//! - Batch scheduling with bounded concurrency and fail-fast abort
//! - A FIFO result cache keyed on node id, input content and prompt
//! - Per-node metrics, cost accounting and a renderable execution graph
//!
//! # Architecture
//!
//! ```text
//! Plan
//!   ↓
//! validate_plan() → structural checks
//!   ↓
//! PlanGraph::analyze() → levels, batches, critical path
//!   ↓
//! Processor::run() → batch loop, cache probes, progress events
//!   ↓
//! execute_batch() → bounded concurrent node tasks
//!   ↓
//! NodeExecutor::execute() → Artifact
//!   ↓
//! ExecutionReport { artifacts, metrics, caching, execution graph }
//! ```

mod cache;
mod cost;
mod graph;
mod processor;
mod progress;
mod run_id;
mod scheduler;
pub mod report;
pub mod traits;

pub use cache::ResultCache;
pub use cost::{node_cost, round_usd};
pub use graph::PlanGraph;
pub use processor::{prepare_node, Processor, ProcessorBuilder};
pub use progress::{ProgressEvent, ProgressObserver};
pub use report::{
    CacheStats, ExecutionGraph, ExecutionMetrics, ExecutionReport, GraphEdge, GraphNode,
    NodeStatus, TokenUsage,
};
pub use run_id::generate_run_id;
pub use scheduler::execute_batch;
pub use traits::{NodeExecutor, PreparedNode};
