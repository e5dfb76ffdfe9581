//! Configuration loaded from `~/.callsync/config.json`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Owner of every row this process writes.
    pub user_id: String,
    pub grain: GrainConfig,
    pub thumbnails: ThumbnailConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: "default".to_string(),
            grain: GrainConfig::default(),
            thumbnails: ThumbnailConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrainConfig {
    /// Personal access token or workspace API key; the auth-scheme fallback
    /// in the client handles either kind.
    pub api_token: String,
    /// Override for self-hosted relays and tests.
    pub api_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThumbnailConfig {
    /// When false the cascade skips network probes and only synthesizes
    /// placeholders.
    pub remote_probes: bool,
    /// Enables the screenshot-generation probe when set.
    pub screenshot_api_key: Option<String>,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            remote_probes: true,
            screenshot_api_key: None,
        }
    }
}

/// Canonical path to the config file: `~/.callsync/config.json`.
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".callsync")
        .join("config.json")
}

/// Load the config file, or defaults when it doesn't exist yet.
pub fn load_config() -> Result<Config, String> {
    let path = config_path();
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
}
