//! Plan execution orchestrator
//!
//! Drives a validated plan through graph analysis, batch-by-batch
//! concurrent node execution, result caching and report assembly.
//! Executors are pluggable behind [`NodeExecutor`]; the processor owns
//! everything else: dependency resolution, cache probes, schema
//! preparation, metrics and progress events.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::engine::cache::ResultCache;
use crate::engine::cost::{node_cost, round_usd};
use crate::engine::graph::PlanGraph;
use crate::engine::progress::{now_ms, ProgressEvent, ProgressObserver};
use crate::engine::report::{
    CacheStats, ExecutionGraph, ExecutionMetrics, ExecutionReport, GraphEdge, GraphNode,
    NodeStatus, TokenUsage,
};
use crate::engine::run_id::generate_run_id;
use crate::engine::scheduler::execute_batch;
use crate::engine::traits::{NodeExecutor, PreparedNode};
use crate::error::EngineError;
use crate::plan::{
    validate_plan, Artifact, ArtifactContent, ArtifactMap, AssetStatus, OutputKind, Plan, PlanNode,
};
use crate::schema::{repair, unwrap_envelope, WrapKind};

const ARRAY_WRAP_HINT: &str = "\n\nIMPORTANT: Return your array response wrapped in an object with \"items\" property, like: {\"items\": [...]}";
const VALUE_WRAP_HINT: &str = "\n\nIMPORTANT: Return your value response wrapped in an object with \"value\" property, like: {\"value\": ...}";

/// Executes plans against a [`NodeExecutor`].
///
/// Construction goes through [`ProcessorBuilder`]. The cache handle can
/// be shared between processors so repeated runs of related plans reuse
/// artifacts.
pub struct Processor {
    executor: Arc<dyn NodeExecutor>,
    cache: Arc<Mutex<ResultCache>>,
    config: EngineConfig,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Processor`]. Only the executor is mandatory.
#[derive(Default)]
pub struct ProcessorBuilder {
    executor: Option<Arc<dyn NodeExecutor>>,
    cache: Option<Arc<Mutex<ResultCache>>>,
    config: EngineConfig,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl ProcessorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executor(mut self, executor: Arc<dyn NodeExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a dedicated cache instead of one built from the config.
    pub fn cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(Arc::new(Mutex::new(cache)));
        self
    }

    /// Share a cache handle with other processors.
    pub fn shared_cache(mut self, cache: Arc<Mutex<ResultCache>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<Processor, EngineError> {
        let executor = self
            .executor
            .ok_or_else(|| EngineError::Config("processor requires an executor".to_string()))?;
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(Mutex::new(ResultCache::new(&self.config.cache))));
        Ok(Processor {
            executor,
            cache,
            config: self.config,
            observer: self.observer,
        })
    }
}

impl Processor {
    pub fn builder() -> ProcessorBuilder {
        ProcessorBuilder::new()
    }

    /// Executes a plan end to end and returns the full report.
    ///
    /// `input` is the run input, interpolated into root-node prompts.
    /// Batches run in dependency order; nodes inside a batch run
    /// concurrently up to the configured parallelism. The first node
    /// failure aborts the run: queued nodes are skipped, in-flight ones
    /// finish but their results are discarded.
    pub async fn run(&self, plan: &Plan, input: &str) -> Result<ExecutionReport, EngineError> {
        let run_id = generate_run_id();
        match self.run_inner(plan, input, &run_id).await {
            Ok(report) => {
                info!(
                    run_id = %run_id,
                    duration_ms = report.duration_ms,
                    total_cost = report.total_cost,
                    cache_hits = report.caching.hits,
                    "plan execution finished"
                );
                self.emit(ProgressEvent::RunFinished {
                    run_id,
                    duration_ms: report.duration_ms,
                    total_cost: report.total_cost,
                    timestamp: now_ms(),
                });
                Ok(report)
            }
            Err(e) => {
                error!(run_id = %run_id, error = %e, "plan execution failed");
                self.emit(ProgressEvent::RunFailed {
                    run_id,
                    node_id: e.node_id().map(str::to_string),
                    message: e.to_string(),
                    timestamp: now_ms(),
                });
                Err(e)
            }
        }
    }

    /// Drops every cached artifact.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Handle to the underlying cache, for sharing or inspection.
    pub fn cache_handle(&self) -> Arc<Mutex<ResultCache>> {
        Arc::clone(&self.cache)
    }

    async fn run_inner(
        &self,
        plan: &Plan,
        input: &str,
        run_id: &str,
    ) -> Result<ExecutionReport, EngineError> {
        let started = Instant::now();

        validate_plan(plan)?;
        let graph = PlanGraph::analyze(plan)?;

        info!(
            run_id = %run_id,
            goal = %plan.goal,
            nodes = plan.len(),
            batches = graph.batch_count(),
            "starting plan execution"
        );
        self.emit(ProgressEvent::RunStarted {
            run_id: run_id.to_string(),
            goal: plan.goal.clone(),
            total_nodes: plan.len(),
            total_batches: graph.batch_count(),
            timestamp: now_ms(),
        });

        let mut artifacts = ArtifactMap::with_capacity(plan.len());
        let mut metrics: Vec<ExecutionMetrics> = Vec::with_capacity(plan.len());
        let abort = Arc::new(AtomicBool::new(false));

        for (batch_idx, batch) in graph.batches.iter().enumerate() {
            debug!(run_id = %run_id, batch = batch_idx, size = batch.len(), "starting batch");
            self.emit(ProgressEvent::BatchStarted {
                run_id: run_id.to_string(),
                batch: batch_idx,
                total_batches: graph.batch_count(),
                size: batch.len(),
                completed_nodes: artifacts.len(),
                total_nodes: plan.len(),
                timestamp: now_ms(),
            });

            let outcomes = self
                .run_batch(plan, input, run_id, batch_idx, batch, &artifacts, &abort)
                .await?;

            for outcome in outcomes {
                self.emit(ProgressEvent::NodeFinished {
                    run_id: run_id.to_string(),
                    node_id: outcome.node_id.clone(),
                    status: outcome.metrics.status,
                    metrics: outcome.metrics.clone(),
                    timestamp: now_ms(),
                });
                if let Some(key) = outcome.cache_key {
                    lock_cache(&self.cache)?.insert(key, outcome.artifact.clone());
                }
                artifacts.insert(outcome.node_id, outcome.artifact);
                metrics.push(outcome.metrics);
            }

            self.emit(ProgressEvent::BatchFinished {
                run_id: run_id.to_string(),
                batch: batch_idx,
                completed_nodes: artifacts.len(),
                total_nodes: plan.len(),
                timestamp: now_ms(),
            });
        }

        let final_output = artifacts
            .get(&plan.final_output)
            .cloned()
            .ok_or_else(|| EngineError::FinalArtifactMissing(plan.final_output.clone()))?;

        let hits = metrics.iter().filter(|m| m.status == NodeStatus::Cached).count();
        let misses = metrics
            .iter()
            .filter(|m| m.status == NodeStatus::Completed)
            .count();
        let total_cost = round_usd(metrics.iter().filter_map(|m| m.cost).sum());

        Ok(ExecutionReport {
            plan: plan.clone(),
            final_output,
            duration_ms: started.elapsed().as_millis() as u64,
            total_cost,
            parallel_batches: graph.batch_count(),
            critical_path: graph.critical_path.clone(),
            caching: CacheStats::new(hits, misses),
            execution_graph: execution_graph(plan, &graph, &metrics),
            metrics,
            artifacts,
        })
    }

    /// Runs one batch concurrently and returns its outcomes in batch
    /// order.
    async fn run_batch(
        &self,
        plan: &Plan,
        input: &str,
        run_id: &str,
        batch_idx: usize,
        batch: &[String],
        artifacts: &ArtifactMap,
        abort: &Arc<AtomicBool>,
    ) -> Result<Vec<NodeOutcome>, EngineError> {
        // Dependency resolution, node preparation and cache keys all
        // happen before spawning so tasks stay self-contained.
        let mut contexts: HashMap<String, TaskCtx> = HashMap::with_capacity(batch.len());
        {
            let cache = lock_cache(&self.cache)?;
            for node_id in batch {
                let node = plan
                    .node(node_id)
                    .ok_or_else(|| EngineError::InvalidPlan(format!("unknown node '{node_id}'")))?;

                let mut deps = HashMap::with_capacity(node.inputs.len());
                for dep in &node.inputs {
                    let artifact = artifacts.get(dep).ok_or_else(|| {
                        EngineError::MissingInputArtifact {
                            node_id: node.id.clone(),
                            missing: dep.clone(),
                        }
                    })?;
                    deps.insert(dep.clone(), artifact.clone());
                }

                // Keyed on the node as authored, before asset overrides.
                let cache_key = cache.key_for(node, artifacts, input);
                contexts.insert(
                    node_id.clone(),
                    TaskCtx {
                        prepared: prepare_node(node),
                        deps,
                        raw_input: node.is_root().then(|| input.to_string()),
                        cache_key,
                        batch: batch_idx,
                    },
                );
            }
        }

        let contexts = Arc::new(Mutex::new(contexts));
        let executor = Arc::clone(&self.executor);
        let cache = Arc::clone(&self.cache);
        let observer = self.observer.clone();
        let run_id = run_id.to_string();
        let max_parallel = self.config.concurrency.max_parallel;

        let mut outcomes = execute_batch(batch, max_parallel, Arc::clone(abort), move |node_id| {
            let contexts = Arc::clone(&contexts);
            let executor = Arc::clone(&executor);
            let cache = Arc::clone(&cache);
            let observer = observer.clone();
            let run_id = run_id.clone();
            async move {
                let ctx = contexts
                    .lock()
                    .map_err(|_| EngineError::Scheduler("task context lock poisoned".to_string()))?
                    .remove(&node_id)
                    .ok_or_else(|| {
                        EngineError::Scheduler(format!("no task context for '{node_id}'"))
                    })?;
                run_node(node_id, ctx, executor, cache, observer, run_id)
                    .await
                    .map(Some)
            }
        })
        .await?;

        outcomes.sort_by_key(|o| batch.iter().position(|id| id == &o.node_id));
        Ok(outcomes)
    }

    fn emit(&self, event: ProgressEvent) {
        notify(&self.observer, event);
    }
}

/// Everything one node task needs, resolved before spawning.
struct TaskCtx {
    prepared: PreparedNode,
    deps: HashMap<String, Artifact>,
    raw_input: Option<String>,
    cache_key: String,
    batch: usize,
}

/// Result of one node task: the artifact plus its metrics row.
///
/// `cache_key` is set only when the node actually executed; the run
/// loop performs the insert during the merge step so cache insertion
/// order stays deterministic under concurrency.
struct NodeOutcome {
    node_id: String,
    artifact: Artifact,
    metrics: ExecutionMetrics,
    cache_key: Option<String>,
}

async fn run_node(
    node_id: String,
    ctx: TaskCtx,
    executor: Arc<dyn NodeExecutor>,
    cache: Arc<Mutex<ResultCache>>,
    observer: Option<Arc<dyn ProgressObserver>>,
    run_id: String,
) -> Result<NodeOutcome, EngineError> {
    let start_time = now_ms();
    let started = Instant::now();

    notify(
        &observer,
        ProgressEvent::NodeStarted {
            run_id: run_id.clone(),
            node_id: node_id.clone(),
            description: ctx.prepared.description.clone(),
            batch: ctx.batch,
            timestamp: start_time,
        },
    );

    let cached = lock_cache(&cache)?.get(&ctx.cache_key).cloned();
    if let Some(artifact) = cached {
        debug!(node_id = %node_id, "cache hit, reusing artifact");
        let metrics = ExecutionMetrics {
            node_id: node_id.clone(),
            start_time,
            end_time: now_ms(),
            duration_ms: started.elapsed().as_millis() as u64,
            tokens_used: None,
            cost: None,
            parallel_batch: ctx.batch,
            dependencies: ctx.prepared.inputs.clone(),
            status: NodeStatus::Cached,
        };
        return Ok(NodeOutcome {
            node_id,
            artifact,
            metrics,
            cache_key: None,
        });
    }

    debug!(
        node_id = %node_id,
        model = ctx.prepared.model.as_deref().unwrap_or("default"),
        "cache miss, executing node"
    );

    let mut artifact = match executor
        .execute(&ctx.prepared, &ctx.deps, ctx.raw_input.as_deref())
        .await
    {
        Ok(artifact) => artifact,
        Err(source) => {
            error!(node_id = %node_id, error = %source, "node execution failed");
            notify(
                &observer,
                ProgressEvent::NodeFailed {
                    run_id,
                    node_id: node_id.clone(),
                    message: source.to_string(),
                    timestamp: now_ms(),
                },
            );
            return Err(EngineError::NodeFailed { node_id, source });
        }
    };

    if ctx.prepared.wrap != WrapKind::None {
        artifact.content = match artifact.content {
            ArtifactContent::Structured(value) => {
                ArtifactContent::Structured(unwrap_envelope(value, ctx.prepared.wrap))
            }
            other => other,
        };
    }

    let metrics = ExecutionMetrics {
        node_id: node_id.clone(),
        start_time,
        end_time: now_ms(),
        duration_ms: started.elapsed().as_millis() as u64,
        tokens_used: token_usage(&artifact),
        cost: Some(node_cost(&artifact)),
        parallel_batch: ctx.batch,
        dependencies: ctx.prepared.inputs.clone(),
        status: NodeStatus::Completed,
    };
    Ok(NodeOutcome {
        node_id,
        artifact,
        metrics,
        cache_key: Some(ctx.cache_key),
    })
}

/// Resolves a node's effective prompt, schema and parameters.
///
/// A ready execution asset overrides the node's own prompt, system
/// prompt, temperature and schema. Structured nodes get their schema
/// repaired here, and a wrapped root adds a response-shape hint to the
/// prompt so models fill the synthetic envelope.
pub fn prepare_node(node: &PlanNode) -> PreparedNode {
    if node.asset_status == Some(AssetStatus::Error) {
        warn!(
            node_id = %node.id,
            error = node.asset_error.as_deref().unwrap_or("unknown"),
            "execution asset unavailable, using node defaults"
        );
    }
    let asset = node.ready_asset();

    let mut prompt_template = asset
        .and_then(|a| a.generated_prompt.clone())
        .unwrap_or_else(|| node.prompt_template.clone());
    let system_prompt = asset
        .and_then(|a| a.system_prompt.clone())
        .or_else(|| node.system_prompt.clone());
    let temperature = asset
        .and_then(|a| a.parameters.as_ref())
        .and_then(|p| p.temperature)
        .or(node.temperature);
    let schema_source = asset
        .and_then(|a| a.output_schema.clone())
        .or_else(|| node.schema.clone());

    let (schema, wrap, repairs, schema_degraded) = match (node.output_type, schema_source) {
        (OutputKind::Structured, Some(raw)) => {
            let repaired = repair(&raw);
            if !repaired.is_clean() {
                warn!(
                    node_id = %node.id,
                    fixes = repaired.records.len(),
                    degraded = repaired.degraded,
                    "schema repaired before execution"
                );
            }
            match repaired.wrap {
                WrapKind::Items => prompt_template.push_str(ARRAY_WRAP_HINT),
                WrapKind::Value => prompt_template.push_str(VALUE_WRAP_HINT),
                WrapKind::None => {}
            }
            (
                Some(repaired.schema),
                repaired.wrap,
                repaired.records,
                repaired.degraded,
            )
        }
        _ => (None, WrapKind::None, Vec::new(), false),
    };

    PreparedNode {
        id: node.id.clone(),
        description: node.description.clone(),
        inputs: node.inputs.clone(),
        prompt_template,
        output_type: node.output_type,
        schema,
        model: node.model.clone(),
        temperature,
        system_prompt,
        wrap,
        repairs,
        schema_degraded,
    }
}

fn token_usage(artifact: &Artifact) -> Option<TokenUsage> {
    match (
        artifact.metadata.prompt_tokens,
        artifact.metadata.completion_tokens,
    ) {
        (None, None) => None,
        (p, c) => {
            let prompt = p.unwrap_or(0);
            let completion = c.unwrap_or(0);
            Some(TokenUsage {
                prompt,
                completion,
                total: artifact
                    .metadata
                    .total_tokens
                    .unwrap_or(prompt + completion),
            })
        }
    }
}

fn execution_graph(plan: &Plan, graph: &PlanGraph, metrics: &[ExecutionMetrics]) -> ExecutionGraph {
    let by_node: HashMap<&str, &ExecutionMetrics> =
        metrics.iter().map(|m| (m.node_id.as_str(), m)).collect();

    let nodes = plan
        .nodes
        .iter()
        .map(|n| {
            let m = by_node.get(n.id.as_str());
            GraphNode {
                id: n.id.clone(),
                level: graph.level_of(&n.id).unwrap_or(0),
                batch: graph.batch_of(&n.id).unwrap_or(0),
                duration_ms: m.map(|m| m.duration_ms).unwrap_or(0),
                status: m.map(|m| m.status).unwrap_or(NodeStatus::Pending),
            }
        })
        .collect();

    let edges = graph
        .edges
        .iter()
        .map(|(source, target)| GraphEdge {
            source: source.clone(),
            target: target.clone(),
        })
        .collect();

    ExecutionGraph { nodes, edges }
}

fn lock_cache(
    cache: &Arc<Mutex<ResultCache>>,
) -> Result<std::sync::MutexGuard<'_, ResultCache>, EngineError> {
    cache
        .lock()
        .map_err(|_| EngineError::Scheduler("result cache lock poisoned".to_string()))
}

fn notify(observer: &Option<Arc<dyn ProgressObserver>>, event: ProgressEvent) {
    if let Some(observer) = observer {
        observer.on_event(&event);
    }
}
