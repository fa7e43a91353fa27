//!
//! src/config.rs  Andrew Belles  Sept 13th, 2025
//!
//! Environment driven settings for every layer of the sync
//!

use std::path::PathBuf;
use std::time;
use url::Url;

use crate::errors::SyncError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 16;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

/// Constants for the resolution pipeline
pub const PACING_MS: u64 = 10;
pub const PROGRESS_EVERY: usize = 5;
pub const TRACKS_PER_ARTIST: usize = 2;
pub const FALLBACK_MARKET: &str = "US";

/// Catalog service hard limits
pub const MAX_CHUNK_SIZE: usize = 100;
pub const PLAYLIST_PAGE_SIZE: u32 = 50;
pub const DEFAULT_PLAYLIST_NAME: &str = "Upcoming Shows Playlist";
pub const PLAYLIST_DESCRIPTION: &str = "Created by Upcoming Playlist Generator";

pub const DEFAULT_SELECTOR: &str = "div.wPBHIIJzw9ltGDuXqcAD";
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Lookup used to read configuration values, the process environment in
/// production and a map in tests
pub type VarLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Wrapper over lookup to return an unset variable error
fn var_check(vars: VarLookup, s: &str) -> Result<String, SyncError> {
    match vars(s) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(SyncError::Config(format!("{s} was not set"))),
    }
}

fn var_or(vars: VarLookup, s: &str, default: &str) -> String {
    vars(s)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn var_to_u64(vars: VarLookup, s: &str, default: u64) -> u64 {
    vars(s).and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(default)
}

fn var_to_usize(vars: VarLookup, s: &str, default: usize) -> usize {
    vars(s).and_then(|v| v.trim().parse::<usize>().ok()).unwrap_or(default)
}

/// Ensures that url is https
pub(crate) fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

/// `Url::join` drops the last segment of a base without a trailing slash
pub(crate) fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
}

///
/// Configuration that the catalog service (Spotify Web API) expects
///
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub api_base: Url,
    pub auth_url: Url,
    pub client_id: Option<String>,
    pub redirect_uri: String,
    pub scopes: String,
}

fn build_catalog(vars: VarLookup) -> Result<CatalogConfig, SyncError> {
    let api_base = var_or(vars, "SPOTIFY_API_BASE", "https://api.spotify.com/v1/");
    let auth_url = var_or(vars, "SPOTIFY_AUTH_URL", "https://accounts.spotify.com/authorize");

    let mut api_base = Url::parse(&api_base)
        .map_err(|e| SyncError::Config(format!("SPOTIFY_API_BASE invalid {e}")))?;
    let auth_url = Url::parse(&auth_url)
        .map_err(|e| SyncError::Config(format!("SPOTIFY_AUTH_URL invalid {e}")))?;

    ensure_https(&api_base).map_err(SyncError::Config)?;
    ensure_https(&auth_url).map_err(SyncError::Config)?;
    ensure_trailing_slash(&mut api_base);

    // only needed when building an authorization url
    let client_id = var_check(vars, "SPOTIFY_CLIENT_ID").ok();
    let redirect_uri = var_or(vars, "SPOTIFY_REDIRECT_URI", "http://localhost:8888/callback");
    let scopes = var_or(
        vars,
        "SPOTIFY_SCOPES",
        "playlist-modify-public playlist-modify-private user-library-read"
    );

    Ok( CatalogConfig { api_base, auth_url, client_id, redirect_uri, scopes } )
}

///
/// Configuration for Http timeouts, pooling, etc.
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

///
/// Configuration for the resolution pipeline, pacing and enrichment
///
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub pacing: time::Duration,     // delay before every resolver call
    pub progress_every: usize,      // report progress every n candidates
    pub tracks_per_artist: usize,   // 1..=2
    pub fallback_market: String,    // used when the profile has no country
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pacing: time::Duration::from_millis(PACING_MS),
            progress_every: PROGRESS_EVERY,
            tracks_per_artist: TRACKS_PER_ARTIST,
            fallback_market: FALLBACK_MARKET.to_string(),
        }
    }
}

fn build_pipeline(vars: VarLookup) -> PipelineConfig {
    let pacing = time::Duration::from_millis(var_to_u64(vars, "LINEUP_PACING_MS", PACING_MS));
    let progress_every = var_to_usize(vars, "LINEUP_PROGRESS_EVERY", PROGRESS_EVERY).max(1);
    let tracks_per_artist = var_to_usize(vars, "LINEUP_TRACKS_PER_ARTIST", TRACKS_PER_ARTIST)
        .clamp(1, TRACKS_PER_ARTIST);
    let fallback_market = var_or(vars, "LINEUP_FALLBACK_MARKET", FALLBACK_MARKET)
        .trim()
        .to_ascii_uppercase();

    PipelineConfig { pacing, progress_every, tracks_per_artist, fallback_market }
}

///
/// Configuration for writing to the destination collection
///
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub chunk_size: usize,
    pub page_size: u32,
    pub default_playlist_name: String,
    pub playlist_description: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: MAX_CHUNK_SIZE,
            page_size: PLAYLIST_PAGE_SIZE,
            default_playlist_name: DEFAULT_PLAYLIST_NAME.to_string(),
            playlist_description: PLAYLIST_DESCRIPTION.to_string(),
        }
    }
}

fn build_sync(vars: VarLookup) -> SyncConfig {
    let chunk_size = var_to_usize(vars, "LINEUP_CHUNK_SIZE", MAX_CHUNK_SIZE)
        .clamp(1, MAX_CHUNK_SIZE);
    let default_playlist_name = var_or(
        vars, "LINEUP_DEFAULT_PLAYLIST_NAME", DEFAULT_PLAYLIST_NAME
    );

    SyncConfig {
        chunk_size,
        default_playlist_name,
        ..SyncConfig::default()
    }
}

///
/// Configuration for fetching the venue page
///
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub relay: Option<String>,   // prefix prepended to the page url
    pub selector: String,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            relay: None,
            selector: DEFAULT_SELECTOR.to_string(),
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

fn build_source(vars: VarLookup) -> SourceConfig {
    SourceConfig {
        relay: var_check(vars, "LINEUP_RELAY_URL").ok(),
        selector: var_or(vars, "LINEUP_SELECTOR", DEFAULT_SELECTOR),
        user_agent: var_or(vars, "LINEUP_USER_AGENT", BROWSER_USER_AGENT),
    }
}

#[derive(Debug, Clone)]
pub struct TokenStoreConfig {
    pub path: PathBuf,
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("./data/token.json") }
    }
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

impl LogFormat {
    fn parse(s: &str) -> Option<LogFormat> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            _ => None
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,rs_lineup_sync=debug,lineup_sync=debug,reqwest=warn".to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            include_file_line: false,
            include_target: true,
        }
    }
}

fn build_logging(vars: VarLookup) -> LoggingConfig {
    let format = vars("LOG_FORMAT")
        .and_then(|v| LogFormat::parse(&v))
        .unwrap_or(LogFormat::Pretty);
    LoggingConfig { format, ..LoggingConfig::default() }
}

///
/// AppConfig which holds everything the sync service needs at start
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub http: HttpConfig,
    pub pipeline: PipelineConfig,
    pub sync: SyncConfig,
    pub source: SourceConfig,
    pub token_store: TokenStoreConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, SyncError> {
    dotenvy::dotenv().ok();
    load_config_from(&|key: &str| std::env::var(key).ok())
}

pub fn load_config_from(vars: VarLookup) -> Result<AppConfig, SyncError> {
    let catalog  = build_catalog(vars)?;
    let http     = HttpConfig::default();
    let pipeline = build_pipeline(vars);
    let sync     = build_sync(vars);
    let source   = build_source(vars);
    let token_store = TokenStoreConfig {
        path: PathBuf::from(var_or(vars, "LINEUP_TOKEN_PATH", "./data/token.json"))
    };
    let logging  = build_logging(vars);

    Ok( AppConfig { catalog, http, pipeline, sync, source, token_store, logging } )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, SyncError> {
        let map: HashMap<String, String> = pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_config_from(&move |k: &str| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_without_environment() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.catalog.api_base.as_str(), "https://api.spotify.com/v1/");
        assert!(cfg.catalog.client_id.is_none());
        assert_eq!(cfg.pipeline.pacing, time::Duration::from_millis(10));
        assert_eq!(cfg.pipeline.tracks_per_artist, 2);
        assert_eq!(cfg.pipeline.fallback_market, "US");
        assert_eq!(cfg.sync.chunk_size, 100);
        assert_eq!(cfg.sync.default_playlist_name, "Upcoming Shows Playlist");
        assert_eq!(cfg.source.selector, DEFAULT_SELECTOR);
        assert!(cfg.source.relay.is_none());
    }

    #[test]
    fn api_base_gains_trailing_slash() {
        let cfg = load(&[("SPOTIFY_API_BASE", "https://catalog.example.com/v1")]).unwrap();
        assert_eq!(cfg.catalog.api_base.as_str(), "https://catalog.example.com/v1/");
        assert_eq!(
            cfg.catalog.api_base.join("search").unwrap().as_str(),
            "https://catalog.example.com/v1/search"
        );
    }

    #[test]
    fn plain_http_catalog_is_rejected() {
        let err = load(&[("SPOTIFY_API_BASE", "http://api.spotify.com/v1/")]).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn limits_are_clamped_to_catalog_bounds() {
        let cfg = load(&[
            ("LINEUP_CHUNK_SIZE", "500"),
            ("LINEUP_TRACKS_PER_ARTIST", "10"),
            ("LINEUP_PROGRESS_EVERY", "0"),
        ]).unwrap();
        assert_eq!(cfg.sync.chunk_size, MAX_CHUNK_SIZE);
        assert_eq!(cfg.pipeline.tracks_per_artist, 2);
        assert_eq!(cfg.pipeline.progress_every, 1);

        let cfg = load(&[("LINEUP_CHUNK_SIZE", "not-a-number")]).unwrap();
        assert_eq!(cfg.sync.chunk_size, MAX_CHUNK_SIZE);
    }

    #[test]
    fn blank_client_id_counts_as_unset() {
        let cfg = load(&[("SPOTIFY_CLIENT_ID", "   "), ("LINEUP_FALLBACK_MARKET", "gb")]).unwrap();
        assert!(cfg.catalog.client_id.is_none());
        assert_eq!(cfg.pipeline.fallback_market, "GB");
    }
}
