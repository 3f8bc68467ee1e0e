use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ragdag_core::api::{
    Artifact, NodeExecutor, NodeExecutorError, OutputKind, Plan, PreparedNode, WrapKind,
};
use serde_json::json;

/// Deterministic stand-in for a generative backend.
///
/// Text nodes yield `out:<id>`, with the run input appended for root
/// nodes so tests can watch it flow in. Structured nodes yield a fixed
/// JSON value shaped to honour the node's repair envelope, the way a
/// strict backend following the wrapped schema would. Executions are
/// counted so tests can tell cache hits from real calls.
pub struct ScriptedExecutor {
    calls: AtomicUsize,
    fail_on: Option<String>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: None,
        }
    }

    pub fn failing_on(node_id: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: Some(node_id.to_string()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        node: &PreparedNode,
        _inputs: &HashMap<String, Artifact>,
        raw_input: Option<&str>,
    ) -> Result<Artifact, NodeExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_on.as_deref() == Some(node.id.as_str()) {
            return Err(NodeExecutorError::Request(format!(
                "scripted failure for '{}'",
                node.id
            )));
        }

        let artifact = match node.output_type {
            OutputKind::Structured => {
                let value = match node.wrap {
                    WrapKind::Items => json!({ "items": [1, 2, 3] }),
                    WrapKind::Value => json!({ "value": "scripted" }),
                    WrapKind::None => json!({ "result": format!("out:{}", node.id) }),
                };
                Artifact::structured(&node.id, value)
            }
            OutputKind::Text => {
                let content = match raw_input {
                    Some(raw) => format!("out:{}:{raw}", node.id),
                    None => format!("out:{}", node.id),
                };
                Artifact::text(&node.id, content)
            }
        };

        Ok(artifact.with_usage("scripted-model", 100, 50))
    }
}

/// Four text nodes in a diamond: `a` fans out to `b` and `c`, which
/// join in `d`.
pub fn diamond_plan() -> Plan {
    serde_json::from_value(json!({
        "goal": "diamond",
        "nodes": [
            {
                "id": "a",
                "description": "Gather source material",
                "inputs": [],
                "promptTemplate": "Gather: {{input}}",
                "outputType": "text"
            },
            {
                "id": "b",
                "description": "First analysis branch",
                "inputs": ["a"],
                "promptTemplate": "Analyze: {{a}}",
                "outputType": "text"
            },
            {
                "id": "c",
                "description": "Second analysis branch",
                "inputs": ["a"],
                "promptTemplate": "Cross-check: {{a}}",
                "outputType": "text"
            },
            {
                "id": "d",
                "description": "Merge both branches",
                "inputs": ["b", "c"],
                "promptTemplate": "Merge: {{b}} with {{c}}",
                "outputType": "text"
            }
        ],
        "finalOutput": "d"
    }))
    .expect("diamond plan literal deserializes")
}
