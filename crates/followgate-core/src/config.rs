//! Followgate configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FollowgateError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowgateConfig {
    /// Where the engine keeps its database. Defaults to `~/.followgate`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

fn default_data_dir() -> String {
    FollowgateConfig::home_dir().to_string_lossy().into_owned()
}

impl Default for FollowgateConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            engine: EngineConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl FollowgateConfig {
    /// Load config from the default path (~/.followgate/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FollowgateError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| FollowgateError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| FollowgateError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Followgate home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".followgate")
    }

    /// Path of the governance database inside `data_dir`.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("governance.db")
    }
}

/// Engine loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How often the scheduler checks for due deferred jobs.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
        }
    }
}

/// Outbound webhook executor settings. When disabled, actions are executed
/// by the no-op executor (logged, never delivered).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Automation endpoint that performs the actual sends.
    #[serde(default)]
    pub url: String,
    /// Extra headers, e.g. an auth token.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = FollowgateConfig::default();
        assert_eq!(config.engine.poll_interval_secs, 30);
        assert!(!config.webhook.enabled);
        assert!(config.db_path().ends_with("governance.db"));
    }

    #[test]
    fn parse_partial_toml() {
        let config: FollowgateConfig = toml::from_str(
            r#"
            data_dir = "/tmp/fg-test"

            [webhook]
            enabled = true
            url = "https://example.test/hooks/outreach"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, "/tmp/fg-test");
        assert!(config.webhook.enabled);
        // Unspecified sections keep their defaults.
        assert_eq!(config.engine.poll_interval_secs, 30);
    }
}
