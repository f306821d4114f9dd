use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use archivio_server::collection::{
    CollectionCache, CollectionSource, DiscogsClient, FavoritesReconciler, FavoritesStore,
    FileFavoritesStore, MemoryFavoritesStore, Paginator, RemoteFavoritesStore,
};
use archivio_server::config;
use archivio_server::server::{run_server, RequestsLoggingLevel};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// The maximum age of release details in HTTP caches, in seconds.
    #[clap(long, default_value_t = 3600)]
    pub content_cache_age_sec: usize,

    /// Releases requested per upstream page (1-100).
    #[clap(long, default_value_t = 100)]
    pub per_page: u32,

    /// How long a synced collection stays fresh, in seconds.
    #[clap(long, default_value_t = 21600)]
    pub cache_ttl_sec: u64,

    /// Attempts per upstream page before giving up.
    #[clap(long, default_value_t = 3)]
    pub retry_attempts: u32,

    /// Delay between attempts on a retryable failure, in milliseconds.
    #[clap(long, default_value_t = 350)]
    pub retry_delay_ms: u64,

    /// Pause between consecutive page requests, in milliseconds.
    #[clap(long, default_value_t = 140)]
    pub page_pause_ms: u64,

    /// JSON file where favorites are persisted. Kept in memory when omitted.
    #[clap(long, value_parser = parse_path)]
    pub favorites_file: Option<PathBuf>,

    /// Override the Discogs API base URL.
    #[clap(long)]
    pub discogs_base_url: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            port: args.port,
            logging_level: args.logging_level.clone(),
            content_cache_age_sec: args.content_cache_age_sec,
            per_page: args.per_page,
            cache_ttl_sec: args.cache_ttl_sec,
            retry_attempts: args.retry_attempts,
            retry_delay_ms: args.retry_delay_ms,
            page_pause_ms: args.page_pause_ms,
            favorites_file: args.favorites_file.clone(),
            discogs_base_url: args.discogs_base_url.clone(),
        }
    }
}

fn build_favorites(settings: &config::FavoritesSettings) -> Result<FavoritesReconciler> {
    let local: Arc<dyn FavoritesStore> = match &settings.file {
        Some(path) => {
            info!("Persisting favorites to {:?}", path);
            Arc::new(FileFavoritesStore::new(path))
        }
        None => {
            info!("No favorites file configured, favorites are kept in memory");
            Arc::new(MemoryFavoritesStore::default())
        }
    };

    let remote: Option<Arc<dyn FavoritesStore>> = match &settings.remote_url {
        Some(url) => {
            info!("Remote favorites store configured at {}", url);
            let store = RemoteFavoritesStore::new(url, settings.remote_key.clone())
                .context("Failed to create remote favorites store")?;
            Some(Arc::new(store))
        }
        None => None,
    };

    Ok(FavoritesReconciler::new(local, remote))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine, the environment may already carry the credentials.
    dotenvy::dotenv().ok();

    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize tracing")?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config =
        config::AppConfig::resolve(&cli_config, file_config, config::EnvConfig::from_env())?;

    info!("Configuration loaded:");
    info!("  port: {}", app_config.port);
    info!("  discogs: {}", app_config.discogs.base_url);
    info!("  per_page: {}", app_config.per_page);
    info!("  cache_ttl: {:?}", app_config.cache_ttl);
    info!(
        "  retry: {} attempts, {:?} delay",
        app_config.retry.max_attempts, app_config.retry.delay
    );

    if app_config.discogs.token.is_none() {
        warn!("DISCOGS_TOKEN is not set, collection requests will fail");
    }
    if app_config.discogs.username.is_none() {
        warn!("DISCOGS_USERNAME is not set, collection requests will fail");
    }

    let source: Arc<dyn CollectionSource> = Arc::new(DiscogsClient::new(app_config.discogs.clone())?);
    let paginator = Paginator::new(
        source,
        app_config.retry,
        app_config.per_page,
        app_config.page_pause,
    );
    let cache = Arc::new(CollectionCache::new(paginator, app_config.cache_ttl));

    let favorites = Arc::new(build_favorites(&app_config.favorites)?);
    let reconciled = favorites.reconcile_session().await;
    info!("{} favorites loaded", reconciled.len());

    // First sync runs while the server already answers requests.
    cache.ensure_fresh_in_background();

    info!("Ready to serve at port {}!", app_config.port);
    run_server(app_config.server_config(), cache, favorites).await
}
