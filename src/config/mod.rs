// Configuration module
// Author: storecache contributors

mod models;

pub use models::*;

use crate::error::{ProxyError, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest, `STORECACHE__SECTION__KEY`)
    /// 2. Config file (`path`, or `~/.storecache/config.toml` when absent)
    /// 3. Defaults (lowest)
    ///
    /// CLI overrides are applied by the caller after loading.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path.to_path_buf()).required(true),
            None => File::with_name(&Self::default_config_path()).required(false),
        };

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("STORECACHE")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cache.precache")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ProxyError::Config(e.to_string()))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| ProxyError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would produce ambiguous cache names or
    /// unreachable fallbacks.
    pub fn validate(&self) -> Result<()> {
        let cache = &self.cache;

        if cache.version.trim().is_empty() {
            return Err(ProxyError::Config("cache.version must not be empty".into()));
        }
        if cache.prefix.is_empty() {
            return Err(ProxyError::Config("cache.prefix must not be empty".into()));
        }
        for path in [&cache.scope, &cache.offline_url, &cache.root_fallback] {
            if !path.starts_with('/') {
                return Err(ProxyError::Config(format!(
                    "'{}' must be an absolute path",
                    path
                )));
            }
        }
        if let Some(asset) = cache.precache.iter().find(|p| !p.starts_with('/')) {
            return Err(ProxyError::Config(format!(
                "precache entry '{}' must be an absolute path",
                asset
            )));
        }
        if cache.precache_attempts == 0 {
            return Err(ProxyError::Config("cache.precache_attempts must be at least 1".into()));
        }
        if !self.origin.base_url.starts_with("http://") && !self.origin.base_url.starts_with("https://") {
            return Err(ProxyError::Config(format!(
                "origin.base_url '{}' must be an http(s) URL",
                self.origin.base_url
            )));
        }

        Ok(())
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".storecache")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}
