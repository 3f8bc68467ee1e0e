//! Node executors for the ragdag engine.
//!
//! Implements the engine's `NodeExecutor` trait twice: [`LlmExecutor`]
//! speaks the OpenAI-compatible chat-completions protocol, and
//! [`SimulationExecutor`] serves deterministic offline responses when
//! no API key is configured. [`executor_from_config`] picks between
//! them.

pub mod llm;
pub mod render;
pub mod simulation;

pub use llm::LlmExecutor;
pub use render::render_prompt;
pub use simulation::{SimulationExecutor, SIMULATION_MODEL};

use std::sync::Arc;

use ragdag_core::api::{LlmConfig, NodeExecutor};
use tracing::warn;

/// Builds the executor the config calls for.
///
/// An absent or sentinel API key selects the simulation executor, so
/// fresh checkouts run plans without credentials.
pub fn executor_from_config(config: &LlmConfig) -> anyhow::Result<Arc<dyn NodeExecutor>> {
    if config.is_simulation() {
        warn!("no API key configured, serving simulated responses");
        Ok(Arc::new(SimulationExecutor::new()))
    } else {
        Ok(Arc::new(LlmExecutor::new(config)?))
    }
}
