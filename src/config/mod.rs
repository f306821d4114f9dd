mod file_config;

pub use file_config::{DiscogsFileConfig, FavoritesFileConfig, FileConfig};

use crate::collection::discogs_client::{ALL_RELEASES_FOLDER, DISCOGS_API_BASE};
use crate::collection::paginator::MAX_PER_PAGE;
use crate::collection::{DiscogsSettings, RetryPolicy};
use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub per_page: u32,
    pub cache_ttl_sec: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub page_pause_ms: u64,
    pub favorites_file: Option<PathBuf>,
    pub discogs_base_url: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            logging_level: RequestsLoggingLevel::Path,
            content_cache_age_sec: 3600,
            per_page: 100,
            cache_ttl_sec: 6 * 60 * 60,
            retry_attempts: 3,
            retry_delay_ms: 350,
            page_pause_ms: 140,
            favorites_file: None,
            discogs_base_url: None,
        }
    }
}

/// Secrets and account identifiers, read from the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub discogs_token: Option<String>,
    pub discogs_username: Option<String>,
    pub discogs_folder_id: Option<String>,
    pub favorites_url: Option<String>,
    pub favorites_key: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            discogs_token: get("DISCOGS_TOKEN"),
            discogs_username: get("DISCOGS_USERNAME"),
            discogs_folder_id: get("DISCOGS_FOLDER_ID"),
            favorites_url: get("FAVORITES_URL"),
            favorites_key: get("FAVORITES_KEY"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,

    // Sync tuning
    pub per_page: u32,
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
    pub page_pause: Duration,

    // Collaborators
    pub discogs: DiscogsSettings,
    pub favorites: FavoritesSettings,
}

#[derive(Debug, Clone, Default)]
pub struct FavoritesSettings {
    /// Local JSON store; favorites live in memory only when unset.
    pub file: Option<PathBuf>,
    pub remote_url: Option<String>,
    pub remote_key: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments, optional TOML file config and
    /// the environment. TOML values override CLI values where present;
    /// environment values override both for the account identifiers.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>, env: EnvConfig) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let content_cache_age_sec = file
            .content_cache_age_sec
            .unwrap_or(cli.content_cache_age_sec);

        let per_page = file.per_page.unwrap_or(cli.per_page);
        if per_page == 0 || per_page > MAX_PER_PAGE {
            bail!("per_page must be between 1 and {}, got {}", MAX_PER_PAGE, per_page);
        }

        let cache_ttl_sec = file.cache_ttl_sec.unwrap_or(cli.cache_ttl_sec);
        if cache_ttl_sec == 0 {
            bail!("cache_ttl_sec must be greater than 0");
        }

        let retry_attempts = file.retry_attempts.unwrap_or(cli.retry_attempts);
        if retry_attempts == 0 {
            bail!("retry_attempts must be at least 1");
        }
        let retry_delay_ms = file.retry_delay_ms.unwrap_or(cli.retry_delay_ms);
        let page_pause_ms = file.page_pause_ms.unwrap_or(cli.page_pause_ms);

        let discogs_file = file.discogs.unwrap_or_default();
        let discogs = DiscogsSettings {
            base_url: discogs_file
                .base_url
                .or_else(|| cli.discogs_base_url.clone())
                .unwrap_or_else(|| DISCOGS_API_BASE.to_string()),
            token: env.discogs_token,
            username: env.discogs_username.or(discogs_file.username),
            folder_id: env
                .discogs_folder_id
                .or(discogs_file.folder_id)
                .unwrap_or_else(|| ALL_RELEASES_FOLDER.to_string()),
            timeout_sec: discogs_file
                .timeout_sec
                .unwrap_or(DiscogsSettings::default().timeout_sec),
        };

        let favorites_file = file.favorites.unwrap_or_default();
        let favorites = FavoritesSettings {
            file: favorites_file
                .file
                .map(PathBuf::from)
                .or_else(|| cli.favorites_file.clone()),
            remote_url: env.favorites_url.or(favorites_file.remote_url),
            remote_key: env.favorites_key,
        };

        Ok(Self {
            port,
            logging_level,
            content_cache_age_sec,
            per_page,
            cache_ttl: Duration::from_secs(cache_ttl_sec),
            retry: RetryPolicy::new(retry_attempts, Duration::from_millis(retry_delay_ms)),
            page_pause: Duration::from_millis(page_pause_ms),
            discogs,
            favorites,
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            content_cache_age_sec: self.content_cache_age_sec,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
