//! Configuration data structures for the gem2claude core.
//!
//! This module defines the schema for the application settings: the
//! signature cache, the backing key-value store and logging.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Thought-signature cache settings.
    #[serde(default)]
    pub signature_cache: SignatureCacheConfig,

    /// Backing key-value store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the thought-signature continuity cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureCacheConfig {
    /// Retention window for every cached signature, reset on each write.
    /// Default: `7200` (2 hours)
    #[serde(default = "default_signature_ttl")]
    pub ttl_seconds: u64,

    /// Signatures shorter than this are not trusted as provenance tokens.
    /// Default: `50`
    #[serde(default = "default_min_signature_length")]
    pub min_signature_length: usize,

    /// Deadline applied to every individual store call.
    /// Default: `500`
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Number of keys requested per SCAN round trip during clear/stats.
    /// Default: `256`
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,

    /// Key prefix of the tool-call namespace.
    /// Default: `sig:tool:`
    #[serde(default = "default_tool_key_prefix")]
    pub tool_key_prefix: String,

    /// Key prefix of the content-addressed thinking namespace.
    /// Default: `sig:thinking:`
    #[serde(default = "default_thinking_key_prefix")]
    pub thinking_key_prefix: String,
}

impl SignatureCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Which key-value backend holds the signature namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map; not shared across instances.
    #[default]
    Memory,
    /// Shared Redis instance (requires the `redis` feature).
    Redis,
}

/// Settings for the backing key-value store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selection.
    /// Default: `memory`
    #[serde(default)]
    pub backend: StoreBackend,

    /// Connection URL used by the Redis backend.
    /// Default: `redis://127.0.0.1:6379`
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Entry bound of the in-process backend; the coldest keys are evicted first.
    /// Default: `100000`
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: u64,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`, `compact`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default trait implementations linking to custom logic

impl Default for SignatureCacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_signature_ttl(),
            min_signature_length: default_min_signature_length(),
            operation_timeout_ms: default_operation_timeout_ms(),
            scan_batch_size: default_scan_batch_size(),
            tool_key_prefix: default_tool_key_prefix(),
            thinking_key_prefix: default_thinking_key_prefix(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            memory_max_entries: default_memory_max_entries(),
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

// Helper functions for serde defaults and shared constants
fn default_signature_ttl() -> u64 {
    2 * 60 * 60
}

fn default_min_signature_length() -> usize {
    50
}

fn default_operation_timeout_ms() -> u64 {
    500
}

fn default_scan_batch_size() -> usize {
    256
}

fn default_tool_key_prefix() -> String {
    "sig:tool:".to_string()
}

fn default_thinking_key_prefix() -> String {
    "sig:thinking:".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_memory_max_entries() -> u64 {
    100_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
