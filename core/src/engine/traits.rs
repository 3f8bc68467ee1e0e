use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::NodeExecutorError;
use crate::plan::{Artifact, OutputKind};
use crate::schema::{RepairRecord, WrapKind};

/// A node after asset resolution and schema repair, ready to hand to an
/// executor.
///
/// Prompt template, system prompt, temperature and schema already
/// reflect any ready execution asset; the schema (when present) has
/// passed through repair and is safe for strict structured output.
#[derive(Debug, Clone)]
pub struct PreparedNode {
    pub id: String,
    pub description: String,
    pub inputs: Vec<String>,
    pub prompt_template: String,
    pub output_type: OutputKind,
    pub schema: Option<Value>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub system_prompt: Option<String>,
    /// Envelope added by schema repair. The engine strips it from the
    /// response artifact; executors only forward the schema as-is.
    pub wrap: WrapKind,
    /// Schema repair diagnostics for this node, empty when no schema or
    /// nothing to fix.
    pub repairs: Vec<RepairRecord>,
    /// True when repair fell back to the minimal object schema.
    pub schema_degraded: bool,
}

/// Executes one prepared node against a generative backend.
///
/// Implementations must be thread-safe (Send + Sync); the engine calls
/// `execute` concurrently for every node of a batch.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Produces the node's artifact.
    ///
    /// `inputs` holds the artifacts of exactly the node's declared
    /// dependencies; `raw_input` is the run input, passed only to root
    /// nodes.
    ///
    /// # Errors
    ///
    /// Returns `NodeExecutorError` if the prompt cannot be rendered,
    /// the backend call fails, or the response cannot be turned into
    /// an artifact of the node's output type.
    async fn execute(
        &self,
        node: &PreparedNode,
        inputs: &HashMap<String, Artifact>,
        raw_input: Option<&str>,
    ) -> Result<Artifact, NodeExecutorError>;
}
