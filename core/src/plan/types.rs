use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output contract of a node: free text or schema-constrained JSON.
///
/// Planner payloads historically used `"json"` for the structured kind;
/// the alias keeps those plans loadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Text,
    #[serde(alias = "json")]
    Structured,
}

impl OutputKind {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured)
    }
}

/// Lifecycle of a precomputed execution asset attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Pending,
    Generating,
    Ready,
    Error,
}

/// Sampling parameters carried by an execution asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
}

/// Token estimate attached to an execution asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEstimate {
    pub prompt: u64,
    pub completion: u64,
}

/// Precomputed execution material for a node, produced by an upstream
/// asset-generation pass. When present and `Ready`, its prompt, system
/// prompt, schema and parameters take precedence over the node's own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<AssetParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_tokens: Option<TokenEstimate>,
}

/// One unit of work in a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNode {
    pub id: String,
    pub description: String,
    /// IDs of nodes whose artifacts this node consumes. Empty for roots.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Prompt template with `{{input}}` / `{{nodeId}}` placeholders.
    pub prompt_template: String,
    pub output_type: OutputKind,
    /// JSON Schema for structured output. Repaired before use; see the
    /// schema module.
    #[serde(default, alias = "jsonSchema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<ExecutionAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_status: Option<AssetStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_error: Option<String>,
}

impl PlanNode {
    pub fn is_root(&self) -> bool {
        self.inputs.is_empty()
    }

    /// The node's asset, if one exists and finished generating.
    pub fn ready_asset(&self) -> Option<&ExecutionAsset> {
        match (self.asset.as_ref(), self.asset_status) {
            (Some(asset), Some(AssetStatus::Ready)) => Some(asset),
            _ => None,
        }
    }
}

/// A DAG of LLM tasks produced by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub goal: String,
    pub nodes: Vec<PlanNode>,
    /// ID of the node whose artifact is the run's result.
    pub final_output: String,
}

impl Plan {
    pub fn node(&self, id: &str) -> Option<&PlanNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Payload of an artifact: plain text or a parsed JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactContent {
    Text(String),
    Structured(Value),
}

impl ArtifactContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Structured(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Text(_) => None,
            Self::Structured(v) => Some(v),
        }
    }

    /// Flat string form, used for cache keys and prompt interpolation.
    /// Structured content renders as compact JSON.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Structured(v) => v.to_string(),
        }
    }
}

/// Provenance and usage accounting attached to every artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    /// Unix milliseconds at artifact creation.
    pub timestamp: i64,
}

/// The output of one node execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: OutputKind,
    pub content: ArtifactContent,
    pub metadata: ArtifactMetadata,
}

impl Artifact {
    pub fn text(node_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: OutputKind::Text,
            content: ArtifactContent::Text(content.into()),
            metadata: ArtifactMetadata {
                node_id: node_id.into(),
                timestamp: chrono::Utc::now().timestamp_millis(),
                ..Default::default()
            },
        }
    }

    pub fn structured(node_id: impl Into<String>, value: Value) -> Self {
        Self {
            kind: OutputKind::Structured,
            content: ArtifactContent::Structured(value),
            metadata: ArtifactMetadata {
                node_id: node_id.into(),
                timestamp: chrono::Utc::now().timestamp_millis(),
                ..Default::default()
            },
        }
    }

    /// Attach model and token usage, chained after a constructor.
    pub fn with_usage(
        mut self,
        model: impl Into<String>,
        prompt_tokens: u64,
        completion_tokens: u64,
    ) -> Self {
        self.metadata.model = Some(model.into());
        self.metadata.prompt_tokens = Some(prompt_tokens);
        self.metadata.completion_tokens = Some(completion_tokens);
        self.metadata.total_tokens = Some(prompt_tokens + completion_tokens);
        self
    }
}

/// Artifact map keyed by node id, as accumulated over a run.
pub type ArtifactMap = HashMap<String, Artifact>;
