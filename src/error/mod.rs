// Error types for gem2claude core
// Author: kelexine (https://github.com/kelexine)

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Store backend error: {0}")]
    Store(String),

    #[error("Store operation timed out after {0:?}")]
    StoreTimeout(Duration),

    #[error("Wrong value type stored at key: {0}")]
    WrongType(String),

    #[error("Invalid model family tag: {0}")]
    InvalidFamily(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl ProxyError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Config(_) | ProxyError::ConfigParsing(_) => "config",
            ProxyError::Store(_) => "backend",
            ProxyError::StoreTimeout(_) => "timeout",
            ProxyError::WrongType(_) => "wrong_type",
            ProxyError::InvalidFamily(_) => "invalid_family",
            ProxyError::Io(_) => "io",
            ProxyError::Json(_) => "json",
            #[cfg(feature = "redis")]
            ProxyError::Redis(_) => "backend",
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
