pub mod engine;
pub mod executor;

pub use engine::EngineError;
pub use executor::NodeExecutorError;
