use thiserror::Error;

use super::executor::NodeExecutorError;

/// Engine-level errors for plan validation, graph analysis and run execution
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Circular dependency detected at node: {0}")]
    CircularDependency(String),

    #[error("Missing input artifact: node '{node_id}' requires '{missing}'")]
    MissingInputArtifact { node_id: String, missing: String },

    #[error("Node '{node_id}' failed: {source}")]
    NodeFailed {
        node_id: String,
        #[source]
        source: NodeExecutorError,
    },

    #[error("Final output artifact '{0}' was not produced")]
    FinalArtifactMissing(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl EngineError {
    /// The node implicated in the error, if the error is attributable to one.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::CircularDependency(id) | Self::FinalArtifactMissing(id) => Some(id),
            Self::MissingInputArtifact { node_id, .. } | Self::NodeFailed { node_id, .. } => {
                Some(node_id)
            }
            Self::InvalidPlan(_) | Self::Scheduler(_) | Self::Config(_) => None,
        }
    }

    /// True when the failure happened before any node executor was invoked.
    pub fn is_pre_execution(&self) -> bool {
        matches!(
            self,
            Self::InvalidPlan(_) | Self::CircularDependency(_) | Self::Config(_)
        )
    }
}
