//! Prompt template rendering
//!
//! Substitutes `{{nodeId}}` placeholders with dependency artifact
//! content and `{{input}}` with the run input. Structured dependency
//! content renders as pretty-printed JSON so models receive readable
//! context.

use std::collections::HashMap;

use ragdag_core::api::{Artifact, ArtifactContent, NodeExecutorError, PreparedNode};

/// Renders a node's prompt from its template.
///
/// Every occurrence of `{{dep}}` is replaced for each declared input;
/// a declared input without an artifact is an error. `{{input}}` is
/// replaced only when a non-empty run input was handed to the node.
pub fn render_prompt(
    node: &PreparedNode,
    inputs: &HashMap<String, Artifact>,
    raw_input: Option<&str>,
) -> Result<String, NodeExecutorError> {
    let mut prompt = node.prompt_template.clone();

    for input_id in &node.inputs {
        let artifact = inputs.get(input_id).ok_or_else(|| {
            NodeExecutorError::Template(format!("missing input artifact '{input_id}'"))
        })?;
        let content = match &artifact.content {
            ArtifactContent::Text(text) => text.clone(),
            ArtifactContent::Structured(value) => serde_json::to_string_pretty(value)
                .map_err(|e| {
                    NodeExecutorError::Template(format!("cannot render input '{input_id}': {e}"))
                })?,
        };
        prompt = prompt.replace(&format!("{{{{{input_id}}}}}"), &content);
    }

    if let Some(raw) = raw_input {
        if !raw.is_empty() {
            prompt = prompt.replace("{{input}}", raw);
        }
    }

    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use ragdag_core::api::{OutputKind, WrapKind};
    use serde_json::json;

    use super::*;

    fn prepared(id: &str, inputs: &[&str], template: &str) -> PreparedNode {
        PreparedNode {
            id: id.to_string(),
            description: String::new(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            prompt_template: template.to_string(),
            output_type: OutputKind::Text,
            schema: None,
            model: None,
            temperature: None,
            system_prompt: None,
            wrap: WrapKind::None,
            repairs: Vec::new(),
            schema_degraded: false,
        }
    }

    #[test]
    fn test_replaces_every_occurrence_of_a_placeholder() {
        let node = prepared("b", &["a"], "first {{a}}, second {{a}}");
        let mut inputs = HashMap::new();
        inputs.insert("a".to_string(), Artifact::text("a", "X"));

        let prompt = render_prompt(&node, &inputs, None).unwrap();
        assert_eq!(prompt, "first X, second X");
    }

    #[test]
    fn test_structured_content_renders_pretty_json() {
        let node = prepared("b", &["a"], "data: {{a}}");
        let mut inputs = HashMap::new();
        inputs.insert(
            "a".to_string(),
            Artifact::structured("a", json!({"k": [1, 2]})),
        );

        let prompt = render_prompt(&node, &inputs, None).unwrap();
        assert_eq!(prompt, "data: {\n  \"k\": [\n    1,\n    2\n  ]\n}");
    }

    #[test]
    fn test_input_placeholder_only_replaced_when_provided() {
        let node = prepared("a", &[], "analyze {{input}} and {{input}}");

        let untouched = render_prompt(&node, &HashMap::new(), None).unwrap();
        assert_eq!(untouched, "analyze {{input}} and {{input}}");

        let empty = render_prompt(&node, &HashMap::new(), Some("")).unwrap();
        assert_eq!(empty, "analyze {{input}} and {{input}}");

        let filled = render_prompt(&node, &HashMap::new(), Some("logs")).unwrap();
        assert_eq!(filled, "analyze logs and logs");
    }

    #[test]
    fn test_missing_dependency_artifact_is_an_error() {
        let node = prepared("b", &["ghost"], "see {{ghost}}");
        let err = render_prompt(&node, &HashMap::new(), None).unwrap_err();
        assert!(err.to_string().contains("missing input artifact 'ghost'"));
    }
}
