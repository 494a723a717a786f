// CLI module for storecache
// Author: storecache contributors

use crate::config::AppConfig;
use clap::Parser;
use std::path::PathBuf;

/// storecache - Offline-first caching proxy for the storefront
#[derive(Parser, Debug)]
#[command(name = "storecache", version, about, long_about = None)]
pub struct Args {
    /// Configuration file (defaults to ~/.storecache/config.toml)
    #[arg(long, short, env = "STORECACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Origin serving the storefront, e.g. http://127.0.0.1:8000
    #[arg(long)]
    pub origin: Option<String>,

    /// Port to listen on
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Cache version tag; bumping it invalidates every cached entry
    #[arg(long = "cache-version")]
    pub cache_version: Option<String>,
}

impl Args {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(origin) = &self.origin {
            config.origin.base_url = origin.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(version) = &self.cache_version {
            config.cache.version = version.clone();
        }
    }
}
