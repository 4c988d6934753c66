use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::{Error, Result};

pub const KEEL_DIR: &str = ".keel";
pub const INDEX_FILE: &str = "index.sqlite";
pub const DECISIONS_FILE: &str = "decisions.jsonl";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeelConfig {
    /// Index file, relative to the repository root
    pub index: Option<String>,
    /// Decisions log, relative to the repository root
    pub decisions: Option<String>,
    pub default_limit: Option<i64>,
    /// Rebuild a stale index before running queries
    pub auto_reindex: bool,
}

impl Default for KeelConfig {
    fn default() -> Self {
        Self {
            index: None,
            decisions: None,
            default_limit: None,
            auto_reindex: true,
        }
    }
}

pub fn keel_dir(repo_root: &Path) -> PathBuf {
    repo_root.join(KEEL_DIR)
}

pub fn default_index_path(repo_root: &Path) -> PathBuf {
    keel_dir(repo_root).join(INDEX_FILE)
}

pub fn default_decisions_path(repo_root: &Path) -> PathBuf {
    keel_dir(repo_root).join(DECISIONS_FILE)
}

pub fn default_config_path(repo_root: &Path) -> PathBuf {
    keel_dir(repo_root).join(CONFIG_FILE)
}

/// Load `.keel/config.toml`, falling back to defaults when absent
pub fn load_config(repo_root: &Path) -> Result<KeelConfig> {
    let path = default_config_path(repo_root);
    if !path.exists() {
        return Ok(KeelConfig::default());
    }

    let contents = std::fs::read_to_string(&path)?;
    toml::from_str(&contents).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

pub fn resolve_index_path(repo_root: &Path, config: &KeelConfig) -> PathBuf {
    match &config.index {
        Some(index) => repo_root.join(index),
        None => default_index_path(repo_root),
    }
}

pub fn resolve_decisions_path(repo_root: &Path, config: &KeelConfig) -> PathBuf {
    match &config.decisions {
        Some(decisions) => repo_root.join(decisions),
        None => default_decisions_path(repo_root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config, KeelConfig::default());
        assert!(config.auto_reindex);
        assert_eq!(resolve_index_path(dir.path(), &config), dir.path().join(".keel/index.sqlite"));
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(keel_dir(dir.path())).unwrap();
        std::fs::write(
            default_config_path(dir.path()),
            "index = \"build/keel.sqlite\"\ndefault_limit = 20\nauto_reindex = false\n",
        )
        .unwrap();

        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.default_limit, Some(20));
        assert!(!config.auto_reindex);
        assert_eq!(resolve_index_path(dir.path(), &config), dir.path().join("build/keel.sqlite"));
        assert_eq!(resolve_decisions_path(dir.path(), &config), dir.path().join(".keel/decisions.jsonl"));
    }

    #[test]
    fn test_partial_config_keeps_auto_reindex() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(keel_dir(dir.path())).unwrap();
        std::fs::write(default_config_path(dir.path()), "default_limit = 5\n").unwrap();

        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.default_limit, Some(5));
        assert!(config.auto_reindex);
    }

    #[test]
    fn test_malformed_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(keel_dir(dir.path())).unwrap();
        std::fs::write(default_config_path(dir.path()), "default_limit = \"many\"").unwrap();

        assert!(matches!(load_config(dir.path()), Err(Error::Config(_))));
    }
}
