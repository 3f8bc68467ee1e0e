//! Stable re-exports for consumers (executor crates and external callers).
//!
//! Prefer importing from `ragdag_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from_path, CacheConfig, ConcurrencyConfig, EngineConfig, LlmConfig,
};
pub use crate::engine::{
    execute_batch, generate_run_id, node_cost, prepare_node, round_usd, CacheStats, ExecutionGraph,
    ExecutionMetrics, ExecutionReport, GraphEdge, GraphNode, NodeExecutor, NodeStatus, PlanGraph,
    PreparedNode, Processor, ProcessorBuilder, ProgressEvent, ProgressObserver, ResultCache,
    TokenUsage,
};
pub use crate::error::{EngineError, NodeExecutorError};
pub use crate::plan::{
    validate_plan, Artifact, ArtifactContent, ArtifactMap, ArtifactMetadata, AssetParameters,
    AssetStatus, ExecutionAsset, OutputKind, Plan, PlanNode, TokenEstimate,
};
pub use crate::schema::{
    minimal_object_schema, repair, unwrap_envelope, RepairRecord, RepairedSchema, WrapKind,
};
