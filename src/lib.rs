// gem2claude-core - Gemini → Anthropic response translation with thought-signature continuity
// Author: kelexine (https://github.com/kelexine)

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod store;
pub mod translation;
pub mod utils;

pub use cache::{SignatureCache, SignatureCacheStats, SignatureCompatibility};
pub use error::{ProxyError, Result};
pub use models::ModelFamily;
pub use translation::{translate_body, translate_response};
