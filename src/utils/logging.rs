//! Structured logging and security-focused trace utilities.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats and providing utilities to prevent
//! replayable thought signatures from leaking into logs.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::{ProxyError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Number of leading characters of a signature kept in log output.
const SIGNATURE_PREVIEW_CHARS: usize = 8;

/// Initializes the global tracing subscriber for the application.
///
/// Supports three output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `compact`: Single-line human-readable output.
/// - `pretty` (default): Human-readable, multi-line output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`. Fails if a global subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<()> {
    // Configure filter from environment or config file
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match config.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    installed.map_err(|e| ProxyError::Config(format!("logging init failed: {}", e)))
}

/// Shorten a thought signature for log lines: a short prefix plus its length.
///
/// Signatures are replayable provenance tokens and must never be logged whole.
pub fn redact_signature(signature: &str) -> String {
    let preview: String = signature.chars().take(SIGNATURE_PREVIEW_CHARS).collect();
    format!("{}…({} chars)", preview, signature.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_signature() {
        let sig = "EqQBCkgIARABGAIiQO".repeat(4);
        let redacted = redact_signature(&sig);
        assert!(redacted.starts_with("EqQBCkgI"));
        assert!(redacted.contains("(72 chars)"));
        assert!(!redacted.contains(&sig));
    }
}
