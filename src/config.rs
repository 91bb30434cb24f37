//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\chart-minder\config.toml
//! - macOS: ~/Library/Application Support/chart-minder/config.toml
//! - Linux: ~/.config/chart-minder/config.toml
//!
//! Every section is optional; missing fields take their defaults. Each
//! component is handed its own section at construction.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chart::ParserConfig;
use crate::matching::MatchingConfig;
use crate::sources::{ProviderConfig, RetrievalConfig};
use crate::theory::SpellingTable;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Clustering thresholds and ranking weights
    pub matching: MatchingConfig,

    /// Source fan-out settings
    pub retrieval: RetrievalConfig,

    pub parser: ParserConfig,

    /// Sharp/flat preference per key
    pub spelling: SpellingConfig,

    pub storage: StorageConfig,

    /// Configured chart providers
    pub providers: Vec<ProviderConfig>,
}

/// Accidental spelling settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellingConfig {
    /// Bias for each key, indexed from C
    pub keys: SpellingTable,
}

/// Persistence settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file; songs are kept in memory when unset
    pub database: Option<PathBuf>,
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chart-minder"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location.
///
/// Returns default config if the file doesn't exist or can't be parsed.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from `path`, falling back to defaults.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::debug!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location.
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)?;
    Ok(path)
}

/// Save configuration to `path`, creating its directory if needed.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ProviderHint;
    use crate::sources::ProviderKind;
    use crate::theory::{AccidentalBias, Pitch};

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[matching]"));
        assert!(toml.contains("[retrieval]"));
        assert!(toml.contains("[parser]"));
        assert!(toml.contains("[spelling]"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.matching.title_threshold = 0.9;
        config.retrieval.timeout_ms = 1500;
        config.storage.database = Some(PathBuf::from("/var/lib/charts.db"));
        config.providers.push(ProviderConfig {
            id: "local".to_string(),
            kind: ProviderKind::Directory {
                path: PathBuf::from("/srv/charts"),
            },
            hint: ProviderHint::ChordPro,
        });

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[matching]
title_threshold = 0.9

[[providers]]
id = "tabsite"
kind = "http"
base_url = "https://charts.example.com"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.matching.title_threshold, 0.9);
        assert_eq!(config.matching.artist_threshold, 0.85);
        assert_eq!(config.retrieval.timeout_ms, 5000);
        assert_eq!(config.parser.max_content_bytes, 50 * 1024);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].hint, ProviderHint::Auto);
        assert!(config.storage.database.is_none());
    }

    #[test]
    fn test_spelling_table_from_toml() {
        let toml = r#"
[spelling]
keys = ["sharp", "sharp", "sharp", "sharp", "sharp", "sharp",
        "sharp", "sharp", "sharp", "sharp", "sharp", "sharp"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.spelling.keys.bias_for(Pitch::F), AccidentalBias::Sharp);
        assert_eq!(
            Config::default().spelling.keys.bias_for(Pitch::F),
            AccidentalBias::Flat
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.retrieval.max_candidates = 5;
        save_to(&config, &path).unwrap();

        assert!(!path.with_extension("toml.tmp").exists());
        assert_eq!(load_from(&path), config);
    }

    #[test]
    fn test_load_never_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(load_from(&path), Config::default());

        std::fs::write(&path, "this is [not toml").unwrap();
        assert_eq!(load_from(&path), Config::default());
    }
}
