use std::collections::{HashMap, HashSet};

use crate::error::EngineError;
use crate::plan::Plan;

/// Dependency-level analysis of a plan.
///
/// Levels drive scheduling: all nodes of one level form a batch that
/// runs concurrently once every earlier batch has settled.
#[derive(Debug, Clone)]
pub struct PlanGraph {
    /// Dependency depth per node: roots are 0, every other node one
    /// past its deepest input.
    pub levels: HashMap<String, usize>,

    /// Node ids grouped by level, plan order preserved within a batch.
    pub batches: Vec<Vec<String>>,

    /// Longest dependency chain terminating at the plan's final output.
    pub critical_path: Vec<String>,

    /// Dependency edges as (source, target) pairs in plan order.
    pub edges: Vec<(String, String)>,

    batch_index: HashMap<String, usize>,
}

impl PlanGraph {
    /// Analyzes a structurally valid plan.
    ///
    /// # Algorithm
    ///
    /// Levels are assigned by a memoized depth-first walk over each
    /// node's inputs. The walk keeps the set of nodes on the active
    /// path; revisiting one is the engine's sole cycle check and fails
    /// with [`EngineError::CircularDependency`] naming that node.
    pub fn analyze(plan: &Plan) -> Result<Self, EngineError> {
        let mut levels: HashMap<String, usize> = HashMap::with_capacity(plan.nodes.len());

        for node in &plan.nodes {
            let mut on_path = HashSet::new();
            level_for(plan, &node.id, &mut levels, &mut on_path)?;
        }

        let max_level = levels.values().copied().max().unwrap_or(0);
        let mut batches: Vec<Vec<String>> = Vec::with_capacity(max_level + 1);
        let mut batch_index: HashMap<String, usize> = HashMap::with_capacity(plan.nodes.len());
        for level in 0..=max_level {
            let batch: Vec<String> = plan
                .nodes
                .iter()
                .filter(|n| levels.get(&n.id) == Some(&level))
                .map(|n| n.id.clone())
                .collect();
            if !batch.is_empty() {
                for id in &batch {
                    batch_index.insert(id.clone(), batches.len());
                }
                batches.push(batch);
            }
        }

        let critical_path = critical_path(plan, &levels);

        let edges = plan
            .nodes
            .iter()
            .flat_map(|n| {
                n.inputs
                    .iter()
                    .map(|input| (input.clone(), n.id.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(Self {
            levels,
            batches,
            critical_path,
            edges,
            batch_index,
        })
    }

    pub fn level_of(&self, node_id: &str) -> Option<usize> {
        self.levels.get(node_id).copied()
    }

    pub fn batch_of(&self, node_id: &str) -> Option<usize> {
        self.batch_index.get(node_id).copied()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }
}

fn level_for(
    plan: &Plan,
    node_id: &str,
    levels: &mut HashMap<String, usize>,
    on_path: &mut HashSet<String>,
) -> Result<usize, EngineError> {
    if on_path.contains(node_id) {
        return Err(EngineError::CircularDependency(node_id.to_string()));
    }
    if let Some(&level) = levels.get(node_id) {
        return Ok(level);
    }

    let node = plan
        .node(node_id)
        .ok_or_else(|| EngineError::InvalidPlan(format!("unknown node '{node_id}'")))?;

    if node.inputs.is_empty() {
        levels.insert(node_id.to_string(), 0);
        return Ok(0);
    }

    on_path.insert(node_id.to_string());
    let mut deepest = 0;
    for input in &node.inputs {
        deepest = deepest.max(level_for(plan, input, levels, on_path)?);
    }
    on_path.remove(node_id);

    let level = deepest + 1;
    levels.insert(node_id.to_string(), level);
    Ok(level)
}

/// Walks back from the final output, at each step following the input
/// with the strictly greatest level. Equal-level candidates keep the
/// earliest entry in the node's declared input order.
fn critical_path(plan: &Plan, levels: &HashMap<String, usize>) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = plan.final_output.clone();

    loop {
        path.push(current.clone());
        let Some(node) = plan.node(&current) else {
            break;
        };
        let Some(first) = node.inputs.first() else {
            break;
        };

        let mut chosen = first.clone();
        for input in &node.inputs[1..] {
            let best = levels.get(&chosen).copied().unwrap_or(0);
            let candidate = levels.get(input).copied().unwrap_or(0);
            if candidate > best {
                chosen = input.clone();
            }
        }
        current = chosen;
    }

    path.reverse();
    path
}
