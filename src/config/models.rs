//! Configuration data structures for the storecache proxy.
//!
//! This module defines the schema for the application settings: the HTTP
//! listener, the origin that serves the storefront, the cache generation
//! (version tag, precache manifest, fallback documents) and logging.
//!
//! Author: storecache contributors

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port, workers).
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream origin settings.
    #[serde(default)]
    pub origin: OriginConfig,

    /// Cache generation and storage settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8080`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads for the Tokio runtime.
    /// Default: Number of logical CPU cores.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Largest request body accepted for pass-through requests, in bytes.
    /// Default: `10485760` (10 MiB)
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

/// Settings for the origin that serves the static storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Base URL every intercepted path is resolved against.
    /// Default: `http://127.0.0.1:8000`
    #[serde(default = "default_origin_url")]
    pub base_url: String,

    /// Request timeout in seconds. This is the only timeout applied to
    /// network fetches.
    /// Default: `30`
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of idle connections kept per host.
    /// Default: `32`
    #[serde(default = "default_pool_size")]
    pub pool_max_idle_per_host: usize,
}

/// Which backend holds the cache stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Stores live in process memory and vanish on restart.
    Memory,
    /// Stores live under `cache.directory` and survive restarts.
    Disk,
}

/// Settings describing the current cache generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Version tag of the current generation. Bumping it is the only way to
    /// invalidate previously cached content.
    /// Default: `v3`
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix shared by every store this application owns.
    /// Default: `bdm-`
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Only paths below this scope are intercepted.
    /// Default: `/`
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Document served to navigations while the origin is unreachable.
    /// Default: `/offline.html`
    #[serde(default = "default_offline_url")]
    pub offline_url: String,

    /// Second-tier navigation fallback.
    /// Default: `/index.html`
    #[serde(default = "default_root_fallback")]
    pub root_fallback: String,

    /// Assets fetched into the precache store on install.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Attempts per precache asset when the origin answers with a
    /// transient status.
    /// Default: `3`
    #[serde(default = "default_precache_attempts")]
    pub precache_attempts: u32,

    /// Whether a freshly installed generation supersedes a waiting one
    /// without a skip-waiting message.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// Storage backend.
    /// Default: `disk`
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Directory used by the disk backend.
    /// Default: `~/.storecache/stores`
    #[serde(default = "default_cache_directory")]
    pub directory: PathBuf,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: default_origin_url(),
            timeout_seconds: default_timeout(),
            pool_max_idle_per_host: default_pool_size(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            prefix: default_prefix(),
            scope: default_scope(),
            offline_url: default_offline_url(),
            root_fallback: default_root_fallback(),
            precache: default_precache(),
            precache_attempts: default_precache_attempts(),
            skip_waiting_on_install: true,
            backend: default_backend(),
            directory: default_cache_directory(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

fn default_origin_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_pool_size() -> usize {
    32
}

fn default_version() -> String {
    "v3".to_string()
}

fn default_prefix() -> String {
    "bdm-".to_string()
}

fn default_scope() -> String {
    "/".to_string()
}

fn default_offline_url() -> String {
    "/offline.html".to_string()
}

fn default_root_fallback() -> String {
    "/index.html".to_string()
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/offline.html",
        "/style.css",
        "/main.js",
        "/products.js",
        "/jokes.js",
        "/manifest.json",
        "/placeholder-poster.jpg",
        "/placeholder-bg.mp4",
        "/placeholder-qr.png",
        "/icons/icon-72.png",
        "/icons/icon-96.png",
        "/icons/icon-128.png",
        "/icons/icon-192.png",
        "/icons/icon-256.png",
        "/icons/icon-384.png",
        "/icons/icon-512.png",
    ]
    .iter()
    .map(|path| path.to_string())
    .collect()
}

fn default_precache_attempts() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_backend() -> StorageBackend {
    StorageBackend::Disk
}

fn default_cache_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".storecache")
        .join("stores")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
