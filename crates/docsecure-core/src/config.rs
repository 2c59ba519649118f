//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, the web origin share links point at,
//! and the last used username.
//!
//! Configuration is stored at `~/.config/docsecure/config.json`. The
//! `DOCSECURE_API_URL` and `DOCSECURE_SHARE_URL` environment variables
//! override the stored URLs without touching the file.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "docsecure";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default API host for a local backend
const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Default web origin for share links. Recipients open share URLs in the
/// web app, not against the API host.
const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub share_base_url: String,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
            last_username: None,
        }
    }
}

impl Config {
    /// Load the stored config (defaults if none), then apply environment
    /// overrides for the two URLs
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config: Self = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var("DOCSECURE_API_URL") {
            config.api_base_url = url;
        }
        if let Ok(url) = std::env::var("DOCSECURE_SHARE_URL") {
            config.share_base_url = url;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted credential
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_local_stack() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.share_base_url, "http://localhost:3000");
        assert!(config.last_username.is_none());
    }

    #[test]
    fn test_parse_tolerates_missing_fields() {
        // Configs written by older builds may lack newer fields
        let config: Config = serde_json::from_str(r#"{"last_username": "alice"}"#).unwrap();
        assert_eq!(config.last_username.as_deref(), Some("alice"));
        assert_eq!(config.api_base_url, "http://localhost:8000");
    }
}
