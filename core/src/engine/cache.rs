//! Content-addressed result cache
//!
//! Keys a node's output by its id, the (truncated) content of its
//! resolved inputs and its prompt template, so re-running a plan with
//! unchanged inputs skips the generative call entirely. Eviction is
//! strictly FIFO on first insertion, never recency-based: re-inserting
//! or reading an existing key does not move it in the eviction queue.

use std::collections::{HashMap, VecDeque};

use crate::config::CacheConfig;
use crate::plan::{Artifact, ArtifactMap, PlanNode};

/// Separator between the segments of a cache key.
const KEY_SEPARATOR: &str = "::";

/// FIFO-bounded map from cache key to artifact.
///
/// Keys are prefix-truncated content, so two distinct inputs sharing a
/// long common prefix can collide; callers needing more discrimination
/// raise `key_content_len` in [`CacheConfig`].
#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<String, Artifact>,
    insertion_order: VecDeque<String>,
    capacity: usize,
    key_content_len: usize,
}

impl ResultCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: HashMap::with_capacity(config.capacity),
            insertion_order: VecDeque::with_capacity(config.capacity),
            capacity: config.capacity.max(1),
            key_content_len: config.key_content_len,
        }
    }

    /// Derives the cache key for one node execution.
    ///
    /// Root nodes key on the run input; all other nodes key on their
    /// dependency artifacts in declared input order (dependencies with
    /// no artifact yet contribute nothing). The node's own prompt
    /// template is always the final segment, so edited plans miss.
    pub fn key_for(&self, node: &PlanNode, artifacts: &ArtifactMap, input: &str) -> String {
        let mut parts: Vec<String> = vec![node.id.clone()];

        if node.inputs.is_empty() {
            parts.push(self.truncate(input).to_string());
        } else {
            for input_id in &node.inputs {
                if let Some(artifact) = artifacts.get(input_id) {
                    parts.push(self.truncate(&artifact.content.to_text()).to_string());
                }
            }
        }

        parts.push(self.truncate(&node.prompt_template).to_string());
        parts.join(KEY_SEPARATOR)
    }

    pub fn get(&self, key: &str) -> Option<&Artifact> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts an artifact, evicting the oldest-inserted entry when the
    /// cache is full. Overwriting an existing key keeps its original
    /// position in the eviction queue.
    pub fn insert(&mut self, key: String, artifact: Artifact) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key, artifact);
            return;
        }

        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.entries.remove(&oldest);
            }
        }

        self.insertion_order.push_back(key.clone());
        self.entries.insert(key, artifact);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }

    /// Char-boundary-safe prefix of `text`, `key_content_len` chars long.
    fn truncate<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.key_content_len) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::plan::OutputKind;

    fn small_cache(capacity: usize) -> ResultCache {
        ResultCache::new(&CacheConfig {
            capacity,
            key_content_len: 100,
        })
    }

    fn node(id: &str, inputs: &[&str], template: &str) -> PlanNode {
        PlanNode {
            id: id.to_string(),
            description: String::new(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            prompt_template: template.to_string(),
            output_type: OutputKind::Text,
            schema: None,
            model: None,
            temperature: None,
            system_prompt: None,
            asset: None,
            asset_status: None,
            asset_error: None,
        }
    }

    #[test]
    fn test_root_key_uses_run_input() {
        let cache = small_cache(10);
        let key = cache.key_for(&node("a", &[], "analyze {{input}}"), &ArtifactMap::new(), "raw");
        assert_eq!(key, "a::raw::analyze {{input}}");
    }

    #[test]
    fn test_dependent_key_uses_artifacts_in_input_order() {
        let cache = small_cache(10);
        let mut artifacts = ArtifactMap::new();
        artifacts.insert("b".to_string(), Artifact::text("b", "beta"));
        artifacts.insert("c".to_string(), Artifact::structured("c", json!({"k": 1})));

        let key = cache.key_for(&node("d", &["c", "b"], "merge"), &artifacts, "ignored");
        assert_eq!(key, "d::{\"k\":1}::beta::merge");
    }

    #[test]
    fn test_missing_dependency_contributes_nothing() {
        let cache = small_cache(10);
        let key = cache.key_for(&node("d", &["ghost"], "merge"), &ArtifactMap::new(), "ignored");
        assert_eq!(key, "d::merge");
    }

    #[test]
    fn test_key_truncates_long_content_on_char_boundary() {
        let cache = ResultCache::new(&CacheConfig {
            capacity: 10,
            key_content_len: 3,
        });
        let key = cache.key_for(&node("a", &[], "héllo wörld"), &ArtifactMap::new(), "日本語のテキスト");
        assert_eq!(key, "a::日本語::hél");
    }

    #[test]
    fn test_fifo_evicts_oldest_inserted_only() {
        let mut cache = small_cache(3);
        for key in ["k1", "k2", "k3"] {
            cache.insert(key.to_string(), Artifact::text("n", key));
        }

        cache.insert("k4".to_string(), Artifact::text("n", "k4"));

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("k1"), "oldest entry must be evicted");
        for key in ["k2", "k3", "k4"] {
            assert!(cache.contains(key), "{key} must survive");
        }
    }

    #[test]
    fn test_reads_do_not_affect_eviction_order() {
        let mut cache = small_cache(2);
        cache.insert("old".to_string(), Artifact::text("n", "old"));
        cache.insert("new".to_string(), Artifact::text("n", "new"));

        // A read of the oldest entry must not protect it.
        assert!(cache.get("old").is_some());
        cache.insert("newest".to_string(), Artifact::text("n", "newest"));

        assert!(!cache.contains("old"));
        assert!(cache.contains("new"));
        assert!(cache.contains("newest"));
    }

    #[test]
    fn test_overwrite_keeps_queue_position() {
        let mut cache = small_cache(2);
        cache.insert("a".to_string(), Artifact::text("n", "a1"));
        cache.insert("b".to_string(), Artifact::text("n", "b"));

        // Overwrite does not evict and does not move "a" to the back.
        cache.insert("a".to_string(), Artifact::text("n", "a2"));
        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.get("a").unwrap().content.to_text(),
            "a2",
            "value must be replaced"
        );

        cache.insert("c".to_string(), Artifact::text("n", "c"));
        assert!(!cache.contains("a"), "a is still the oldest insertion");
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut cache = small_cache(2);
        cache.insert("a".to_string(), Artifact::text("n", "a"));
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains("a"));
        cache.insert("b".to_string(), Artifact::text("n", "b"));
        assert_eq!(cache.len(), 1);
    }
}
