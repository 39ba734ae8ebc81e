// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{ProxyError, Result};
use crate::store::MAX_TTL;
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest)
    /// 2. Config file
    /// 3. Defaults (lowest)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_config_path())
    }

    /// Same layering as [`AppConfig::load`] with an explicit config file path.
    /// A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            // Load from config file if it exists
            .add_source(File::from(path).required(false))
            // Override with environment variables, e.g. GEM2CLAUDE__STORE__BACKEND=redis
            .add_source(
                Environment::with_prefix("GEM2CLAUDE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| ProxyError::Config(e.to_string()))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| ProxyError::Config(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<()> {
        let sig = &self.signature_cache;
        if sig.ttl_seconds == 0 || sig.ttl_seconds > MAX_TTL.as_secs() {
            return Err(ProxyError::Config(format!(
                "signature_cache.ttl_seconds must be between 1 and {}",
                MAX_TTL.as_secs()
            )));
        }
        if self.store.memory_max_entries == 0 {
            return Err(ProxyError::Config(
                "store.memory_max_entries must be positive".to_string(),
            ));
        }
        if sig.scan_batch_size == 0 {
            return Err(ProxyError::Config(
                "signature_cache.scan_batch_size must be positive".to_string(),
            ));
        }
        if sig.tool_key_prefix.is_empty()
            || sig.thinking_key_prefix.is_empty()
            || sig.tool_key_prefix.starts_with(&sig.thinking_key_prefix)
            || sig.thinking_key_prefix.starts_with(&sig.tool_key_prefix)
        {
            return Err(ProxyError::Config(
                "signature_cache key prefixes must be non-empty and disjoint".to_string(),
            ));
        }
        Ok(())
    }

    fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gem2claude")
            .join("config.toml")
    }
}
