//! ragdag-core: DAG execution engine for LLM task plans.
//!
//! Plans arrive from an upstream planner as JSON task graphs. The
//! engine validates them, derives parallel execution batches, runs
//! nodes through a pluggable [`engine::NodeExecutor`], caches results
//! and assembles a full execution report with per-node metrics.
//!
//! See [`api`] for the stable import surface.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod plan;
pub mod schema;
