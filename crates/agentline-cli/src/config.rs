//! Client configuration.

use agentline_core::{ControllerConfig, DEFAULT_EVENT_PREFIX, HttpBackendConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Location checked when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_notice_ttl_secs")]
    pub notice_ttl_secs: u64,
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    #[serde(default = "default_event_prefix")]
    pub event_prefix: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_notice_ttl_secs() -> u64 {
    3
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_event_prefix() -> String {
    DEFAULT_EVENT_PREFIX.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            notice_ttl_secs: default_notice_ttl_secs(),
            download_dir: default_download_dir(),
            event_prefix: default_event_prefix(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Load `path` if given, else the default location if it exists, else
    /// built-in defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load_from(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn backend_config(&self) -> HttpBackendConfig {
        HttpBackendConfig {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            notice_ttl: Duration::from_secs(self.notice_ttl_secs),
            event_prefix: self.event_prefix.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agentline.toml");
        std::fs::write(&path, "base_url = \"http://agent.internal:9000\"\nnotice_ttl_secs = 5\n")
            .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url, "http://agent.internal:9000");
        assert_eq!(config.notice_ttl_secs, 5);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.event_prefix, "data: ");
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(Config::resolve(Some(&missing)).is_err());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "connect_timeout_secs = \"soon\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_core_configs() {
        let config = Config {
            connect_timeout_secs: 4,
            notice_ttl_secs: 7,
            event_prefix: "event: ".into(),
            ..Config::default()
        };

        let backend = config.backend_config();
        assert_eq!(backend.base_url, "http://localhost:8000");
        assert_eq!(backend.connect_timeout, Duration::from_secs(4));

        let controller = config.controller_config();
        assert_eq!(controller.notice_ttl, Duration::from_secs(7));
        assert_eq!(controller.event_prefix, "event: ");
    }
}
