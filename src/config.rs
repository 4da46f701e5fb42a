//! User configuration (`~/.config/chapar/config.toml`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::paths;
use crate::theme::Theme;

/// Overrides `api_base_url` when set
pub const BASE_URL_ENV: &str = "CHAPAR_API_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Backend root, without a trailing slash
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for AI chat messages, which wait on the model
    #[serde(default = "default_chat_timeout_secs")]
    pub chat_timeout_secs: u64,

    /// Posts per page in the status lists
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    #[serde(default)]
    pub theme: Theme,

    /// Keep session cookies between runs
    #[serde(default = "default_remember_session")]
    pub remember_session: bool,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_chat_timeout_secs() -> u64 {
    60
}

fn default_page_size() -> u64 {
    10
}

fn default_remember_session() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            timeout_secs: default_timeout_secs(),
            chat_timeout_secs: default_chat_timeout_secs(),
            page_size: default_page_size(),
            theme: Theme::default(),
            remember_session: default_remember_session(),
        }
    }
}

impl Config {
    /// Load from the default path, or defaults when the file is missing
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&paths::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Base URL after applying the environment override
    pub fn base_url(&self) -> String {
        Self::pick_base_url(std::env::var(BASE_URL_ENV).ok(), &self.api_base_url)
    }

    fn pick_base_url(env: Option<String>, configured: &str) -> String {
        env.filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| configured.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string()
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub const fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }

    /// Page size, never zero
    pub fn page_size(&self) -> u64 {
        self.page_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.page_size(), 10);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            api_base_url: "https://api.example.com".into(),
            page_size: 25,
            remember_session: false,
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_base_url = \"https://x.io/\"\npage_size = 0\n").unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.chat_timeout_secs, 60);
        assert_eq!(config.page_size(), 1);
        assert_eq!(Config::pick_base_url(None, &config.api_base_url), "https://x.io");
    }

    #[test]
    fn test_env_override_wins() {
        assert_eq!(
            Config::pick_base_url(Some("https://env.io/".into()), "http://localhost:8000"),
            "https://env.io"
        );
        assert_eq!(
            Config::pick_base_url(Some("  ".into()), "http://localhost:8000"),
            "http://localhost:8000"
        );
    }
}
