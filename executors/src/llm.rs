//! OpenAI-compatible chat-completions executor
//!
//! Sends one chat completion per node. Structured nodes request strict
//! `json_schema` output when a repaired schema is present, otherwise
//! `json_object`; the engine is responsible for stripping any synthetic
//! envelope afterwards.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use ragdag_core::api::{
    Artifact, LlmConfig, NodeExecutor, NodeExecutorError, OutputKind, PreparedNode,
};

use crate::render::render_prompt;

const JSON_ONLY_SYSTEM_PROMPT: &str =
    "You must respond with valid JSON only. No additional text or markdown formatting.";

const BODY_PREVIEW_LIMIT: usize = 512;

/// Executes nodes against an OpenAI-compatible chat-completions API.
pub struct LlmExecutor {
    http: reqwest::Client,
    url_chat: String,
    api_key: String,
    default_model: String,
}

impl LlmExecutor {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        let normalized = config.base_url.trim_end_matches('/');
        Ok(Self {
            http,
            url_chat: format!("{normalized}/chat/completions"),
            api_key: config.api_key.clone(),
            default_model: config.default_model.clone(),
        })
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.trim().is_empty() {
            req
        } else {
            req.bearer_auth(&self.api_key)
        }
    }
}

#[async_trait]
impl NodeExecutor for LlmExecutor {
    async fn execute(
        &self,
        node: &PreparedNode,
        inputs: &HashMap<String, Artifact>,
        raw_input: Option<&str>,
    ) -> Result<Artifact, NodeExecutorError> {
        let prompt = render_prompt(node, inputs, raw_input)?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = node.system_prompt.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        } else if node.output_type.is_structured() {
            messages.push(ChatMessage {
                role: "system",
                content: JSON_ONLY_SYSTEM_PROMPT,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &prompt,
        });

        let model = node.model.as_deref().unwrap_or(&self.default_model);
        let response_format = match node.output_type {
            OutputKind::Structured => Some(match &node.schema {
                Some(schema) => ResponseFormat::JsonSchema {
                    json_schema: JsonSchemaSpec {
                        name: "response",
                        strict: true,
                        schema,
                    },
                },
                None => ResponseFormat::JsonObject,
            }),
            OutputKind::Text => None,
        };

        let request = ChatRequest {
            model,
            messages,
            temperature: node.temperature,
            response_format,
        };

        debug!(
            node_id = %node.id,
            model = %model,
            structured = node.output_type.is_structured(),
            "chat completion request"
        );

        let resp = self
            .auth(self.http.post(&self.url_chat).json(&request))
            .send()
            .await
            .map_err(|e| {
                NodeExecutorError::Request(format!("chat completion request failed: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NodeExecutorError::Request(format!(
                "chat completion returned HTTP {}: {}",
                status.as_u16(),
                preview_body(&body)
            )));
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| {
            NodeExecutorError::InvalidResponse(format!("cannot decode chat completion body: {e}"))
        })?;

        let raw_content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let mut artifact = build_artifact(node, raw_content)?;
        artifact.metadata.model = Some(model.to_string());
        if let Some(usage) = parsed.usage {
            artifact = artifact.with_usage(model, usage.prompt_tokens, usage.completion_tokens);
        }
        Ok(artifact)
    }
}

/// Turns the raw response into an artifact of the node's output type.
fn build_artifact(node: &PreparedNode, raw: String) -> Result<Artifact, NodeExecutorError> {
    match node.output_type {
        OutputKind::Text => Ok(Artifact::text(&node.id, raw)),
        OutputKind::Structured => {
            let value: Value = serde_json::from_str(&raw).map_err(|e| {
                NodeExecutorError::InvalidResponse(format!(
                    "node '{}' returned invalid JSON ({e}): {}",
                    node.id,
                    preview_body(&raw)
                ))
            })?;
            Ok(Artifact::structured(&node.id, value))
        }
    }
}

/// First chars of a body for error messages, never the whole payload.
fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if trimmed.chars().count() > BODY_PREVIEW_LIMIT {
        out.push_str("...");
    }
    out
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ResponseFormat<'a> {
    #[serde(rename = "json_schema")]
    JsonSchema { json_schema: JsonSchemaSpec<'a> },
    #[serde(rename = "json_object")]
    JsonObject,
}

#[derive(Serialize)]
struct JsonSchemaSpec<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}
