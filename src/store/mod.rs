//! Key-value store interface consumed by the signature cache.
//!
//! The surface mirrors the subset of Redis semantics the cache relies on:
//! string values and hashes with a whole-key TTL, existence checks,
//! multi-key delete and a cursor-based prefix scan. Expired keys are
//! invisible to every operation.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use memory::{MemoryStore, DEFAULT_MAX_ENTRIES};
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Longest retention any backend is asked for.
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Cap a TTL at [`MAX_TTL`] so deadline arithmetic cannot overflow.
pub(crate) fn clamp_ttl(ttl: Duration) -> Duration {
    ttl.min(MAX_TTL)
}

/// One page of a prefix scan. A `cursor` of 0 means the scan is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub cursor: u64,
    pub keys: Vec<String>,
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a string value. Missing or expired keys yield `None`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a string value and (re)set its TTL.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Set hash fields and (re)set the TTL of the whole key.
    async fn hset_ex(&self, key: &str, fields: &[(&str, &str)], ttl: Duration) -> Result<()>;

    /// Read every field of a hash. Missing keys yield an empty map.
    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Delete keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// Enumerate keys starting with `prefix`, `count` being a hint for the
    /// page size. Start with cursor 0 and continue until it comes back as 0.
    /// Resuming a cursor the backend no longer tracks is an error.
    async fn scan(&self, cursor: u64, prefix: &str, count: usize) -> Result<ScanPage>;
}

/// Construct the backend selected by configuration.
pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn KvStore>> {
    match config.backend {
        StoreBackend::Memory => {
            info!(
                "Using in-process signature store (max {} entries)",
                config.memory_max_entries
            );
            Ok(Arc::new(MemoryStore::with_capacity(
                config.memory_max_entries,
            )))
        }
        #[cfg(feature = "redis")]
        StoreBackend::Redis => {
            info!("Connecting to Redis signature store");
            Ok(Arc::new(RedisStore::connect(&config.redis_url).await?))
        }
        #[cfg(not(feature = "redis"))]
        StoreBackend::Redis => Err(crate::error::ProxyError::Config(
            "store.backend = \"redis\" requires the `redis` feature".to_string(),
        )),
    }
}
