use std::collections::HashSet;

use crate::error::EngineError;
use crate::plan::types::Plan;

/// Structural plan validation, run before anything executes.
///
/// Catches empty plans, duplicate node ids, references to nodes that do
/// not exist, and a `final_output` that names no node. Cycles are not
/// detected here; the graph analysis reports those while assigning
/// levels.
pub fn validate_plan(plan: &Plan) -> Result<(), EngineError> {
    if plan.nodes.is_empty() {
        return Err(EngineError::InvalidPlan(
            "plan contains no nodes".to_string(),
        ));
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(plan.nodes.len());
    for node in &plan.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(EngineError::InvalidPlan(format!(
                "duplicate node id '{}'",
                node.id
            )));
        }
    }

    for node in &plan.nodes {
        for input in &node.inputs {
            if !seen.contains(input.as_str()) {
                return Err(EngineError::InvalidPlan(format!(
                    "node '{}' references non-existent input '{}'",
                    node.id, input
                )));
            }
        }
    }

    if !seen.contains(plan.final_output.as_str()) {
        return Err(EngineError::InvalidPlan(format!(
            "final output node '{}' not found in plan",
            plan.final_output
        )));
    }

    Ok(())
}
