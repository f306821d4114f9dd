use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub content_cache_age_sec: Option<usize>,

    // Sync tuning
    pub per_page: Option<u32>,
    pub cache_ttl_sec: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub page_pause_ms: Option<u64>,

    // Sections
    pub discogs: Option<DiscogsFileConfig>,
    pub favorites: Option<FavoritesFileConfig>,
}

/// `[discogs]` section. The token is only read from the environment.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DiscogsFileConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub folder_id: Option<String>,
    pub timeout_sec: Option<u64>,
}

/// `[favorites]` section. The remote key is only read from the environment.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct FavoritesFileConfig {
    pub file: Option<String>,
    pub remote_url: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
