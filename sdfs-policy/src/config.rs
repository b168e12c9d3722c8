//! TOML configuration for a file-backed store.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Errors from configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SdfsConfig {
    pub store: StoreConfig,
}

/// Where resources and their policies are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Root directory of the store. Created on open if missing.
    pub root: PathBuf,
}

impl SdfsConfig {
    /// Load configuration from a TOML file path.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: SdfsConfig = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let config = SdfsConfig::parse(
            r#"
[store]
root = "/var/lib/sdfs"
            "#,
        )
        .expect("Failed to parse config");
        assert_eq!(config.store.root, PathBuf::from("/var/lib/sdfs"));
    }

    #[test]
    fn test_missing_store_section() {
        let result = SdfsConfig::parse("");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("sdfs.toml");
        std::fs::write(&path, "[store]\nroot = \"data\"\n").expect("write config");

        let config = SdfsConfig::from_file(&path).expect("load config");
        assert_eq!(config.store.root, PathBuf::from("data"));

        let missing = SdfsConfig::from_file(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
