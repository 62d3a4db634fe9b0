//! Project configuration file support for talescore.
//!
//! Loads configuration from `talescore.toml` in the working directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Project-level configuration loaded from `talescore.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Providers to score with (names or aliases, e.g. "gemini")
    pub providers: Option<Vec<String>>,
    /// Character budget for content interpolated into the prompt
    pub content_budget: Option<usize>,
    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Database path override
    pub db_path: Option<String>,
    /// Model identifier override, applied to every provider
    pub model: Option<String>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "talescore.toml";

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_parses_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "providers = [\"gemini\", \"claude\"]\ncontent_budget = 2000\ntimeout_secs = 10\n",
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(
            config.providers.as_deref(),
            Some(&["gemini".to_string(), "claude".to_string()][..])
        );
        assert_eq!(config.content_budget, Some(2000));
        assert_eq!(config.timeout_secs, Some(10));
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_unknown_field_is_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "not_a_field = true\n").unwrap();
        assert!(ProjectConfig::load(dir.path()).is_err());
    }
}
