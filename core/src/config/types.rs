use serde::{Deserialize, Serialize};

/// Engine-wide configuration, loadable from TOML with env overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

/// Result cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached artifacts before FIFO eviction.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// How many chars of each input/content segment feed the cache key.
    #[serde(default = "default_key_content_len")]
    pub key_content_len: usize,
}

fn default_cache_capacity() -> usize {
    100
}

fn default_key_content_len() -> usize {
    100
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            key_content_len: default_key_content_len(),
        }
    }
}

/// Per-batch fan-out limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Upper bound on concurrently executing nodes within one batch.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

fn default_max_parallel() -> usize {
    8
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
        }
    }
}

/// Settings consumed by LLM-backed node executors.
///
/// An empty `api_key` puts executors into simulation mode, which serves
/// deterministic offline responses instead of calling the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Model used when a node specifies none.
    #[serde(default = "default_llm_model")]
    pub default_model: String,

    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4.1-nano".to_string()
}

fn default_llm_timeout_ms() -> u64 {
    120_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: String::new(),
            default_model: default_llm_model(),
            timeout_ms: default_llm_timeout_ms(),
        }
    }
}

impl LlmConfig {
    /// True when no credential is configured and executors should fall
    /// back to simulated responses.
    pub fn is_simulation(&self) -> bool {
        let key = self.api_key.trim();
        key.is_empty() || key == "SIMULATION_MODE"
    }
}
