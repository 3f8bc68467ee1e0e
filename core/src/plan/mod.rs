pub mod types;
pub mod validate;

pub use types::{
    Artifact, ArtifactContent, ArtifactMap, ArtifactMetadata, AssetParameters, AssetStatus,
    ExecutionAsset, OutputKind, Plan, PlanNode, TokenEstimate,
};
pub use validate::validate_plan;
