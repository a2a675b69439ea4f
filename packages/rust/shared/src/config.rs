//! Application configuration for Destinos.
//!
//! User config lives at `~/.destinos/destinos.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DestinosError, Result};
use crate::types::DOCUMENT_VERSION;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "destinos.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".destinos";

// ---------------------------------------------------------------------------
// Config structs (matching destinos.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Link resolution settings.
    #[serde(default)]
    pub links: LinksConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Where the enriched document is written when `--out` is not given.
    #[serde(default = "default_output")]
    pub output: String,

    /// Version string written into the document metadata.
    #[serde(default = "default_version")]
    pub document_version: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            document_version: default_version(),
        }
    }
}

fn default_output() -> String {
    "enriched-places.json".into()
}
fn default_version() -> String {
    DOCUMENT_VERSION.into()
}

/// `[links]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    /// Resolve links dynamically for every Nth place (0 = never, 1 = all).
    #[serde(default = "default_crawl_every")]
    pub crawl_every: u32,

    /// Maximum concurrent link lookups.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Per-lookup timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Minimum ms to wait before each lookup.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// Search URL template; `{query}` is replaced by the encoded query.
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Appended to `"{nombre} {destino}"` when a place has no `search_query`.
    #[serde(default = "default_query_suffix")]
    pub query_suffix: String,

    /// Hosts never accepted as reference links, matched on label boundaries.
    #[serde(default = "default_blocked_hosts")]
    pub blocked_hosts: Vec<String>,

    /// Optional curated link table on disk; the built-in table is used otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curated_table: Option<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            crawl_every: default_crawl_every(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout(),
            rate_limit_ms: default_rate_limit(),
            search_url: default_search_url(),
            query_suffix: default_query_suffix(),
            blocked_hosts: default_blocked_hosts(),
            curated_table: None,
        }
    }
}

fn default_crawl_every() -> u32 {
    5
}
fn default_concurrency() -> u32 {
    4
}
fn default_timeout() -> u64 {
    30
}
fn default_rate_limit() -> u64 {
    200
}
fn default_search_url() -> String {
    "https://www.google.com/search?q={query}".into()
}
fn default_query_suffix() -> String {
    "Mexico things to know visit guide".into()
}
fn default_blocked_hosts() -> Vec<String> {
    [
        "google.com",
        "gstatic.com",
        "googleusercontent.com",
        "youtube.com",
        "youtu.be",
        "facebook.com",
        "instagram.com",
        "tiktok.com",
        "twitter.com",
        "x.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// ---------------------------------------------------------------------------
// Resolver config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime link-resolution configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Resolve every Nth place (0 = never).
    pub crawl_every: u32,
    /// Maximum concurrent lookups.
    pub concurrency: u32,
    /// Per-lookup timeout.
    pub timeout: Duration,
    /// Delay before each lookup.
    pub rate_limit_ms: u64,
    /// Search URL template with a `{query}` placeholder.
    pub search_url: String,
    /// Query suffix for places without a seed query.
    pub query_suffix: String,
    /// Noise hosts filtered out of candidates.
    pub blocked_hosts: Vec<String>,
}

impl From<&AppConfig> for ResolverConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            crawl_every: config.links.crawl_every,
            concurrency: config.links.concurrency.max(1),
            timeout: Duration::from_secs(config.links.timeout_secs),
            rate_limit_ms: config.links.rate_limit_ms,
            search_url: config.links.search_url.clone(),
            query_suffix: config.links.query_suffix.clone(),
            blocked_hosts: config.links.blocked_hosts.clone(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.destinos/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DestinosError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.destinos/destinos.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DestinosError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DestinosError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DestinosError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DestinosError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DestinosError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
