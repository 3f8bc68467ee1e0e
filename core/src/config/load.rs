use std::path::{Path, PathBuf};

use super::types::EngineConfig;

/// Default ragdag data directory: ~/.ragdag
pub fn get_ragdag_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".ragdag"))
}

/// Loads a config file from an explicit path.
pub fn load_from_path(path: &Path) -> anyhow::Result<EngineConfig> {
    let raw = std::fs::read_to_string(path)?;
    Ok(toml::from_str::<EngineConfig>(&raw)?)
}

/// Loads the engine config from the usual locations, then applies
/// environment overrides.
///
/// Priority: `~/.ragdag/config.toml`, then `./ragdag.toml`, then
/// built-in defaults. `RAGDAG_*` environment variables win over file
/// values; `OPENAI_API_KEY` is honored when no ragdag-specific key is
/// set.
pub fn load_default() -> anyhow::Result<EngineConfig> {
    let home_config = get_ragdag_data_dir()?.join("config.toml");
    let local_config = Path::new("ragdag.toml");

    let mut cfg: EngineConfig = if home_config.exists() {
        load_from_path(&home_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        EngineConfig::default()
    };

    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn apply_env_overrides(cfg: &mut EngineConfig) {
    if let Ok(v) = std::env::var("RAGDAG_OPENAI_API_KEY") {
        if !v.trim().is_empty() {
            cfg.llm.api_key = v;
        }
    }
    if cfg.llm.api_key.trim().is_empty() {
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            if !v.trim().is_empty() {
                cfg.llm.api_key = v;
            }
        }
    }
    if let Ok(v) = std::env::var("RAGDAG_OPENAI_BASE_URL") {
        if !v.trim().is_empty() {
            cfg.llm.base_url = v;
        }
    }
    if let Ok(v) = std::env::var("RAGDAG_DEFAULT_MODEL") {
        if !v.trim().is_empty() {
            cfg.llm.default_model = v;
        }
    }
    if let Some(n) = env_usize("RAGDAG_MAX_PARALLEL") {
        cfg.concurrency.max_parallel = n;
    }
    if let Some(n) = env_usize("RAGDAG_CACHE_CAPACITY") {
        cfg.cache.capacity = n;
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [concurrency]
            max_parallel = 2

            [cache]
            capacity = 5
            key_content_len = 50
            "#
        )
        .unwrap();

        let cfg = load_from_path(file.path()).unwrap();
        assert_eq!(cfg.concurrency.max_parallel, 2);
        assert_eq!(cfg.cache.capacity, 5);
        assert_eq!(cfg.cache.key_content_len, 50);
        // Untouched section keeps defaults.
        assert_eq!(cfg.llm.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_load_from_path_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache = \"not a table\"").unwrap();
        assert!(load_from_path(file.path()).is_err());
    }
}
