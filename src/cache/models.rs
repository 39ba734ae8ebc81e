//! Signature cache records, statistics and translation captures.

// Author: kelexine (https://github.com/kelexine)

use crate::models::ModelFamily;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Hash field holding the model family tag of a thinking signature.
pub const FIELD_FAMILY: &str = "family";

/// Hash field holding the RFC 3339 write timestamp of a thinking signature.
pub const FIELD_CACHED_AT: &str = "cached_at";

/// Namespace label of tool-call signatures.
pub const NAMESPACE_TOOL: &str = "tool";

/// Namespace label of thinking signatures.
pub const NAMESPACE_THINKING: &str = "thinking";

/// Stored provenance of a thinking signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThinkingSignatureRecord {
    /// Family of the model that produced the signature.
    pub family: ModelFamily,
    /// When the record was last written. `None` if the stored value was unreadable.
    pub cached_at: Option<DateTime<Utc>>,
}

/// Entry counts per namespace.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignatureCacheStats {
    /// Live tool-call signatures.
    pub tool: u64,
    /// Live thinking signatures.
    pub thinking: u64,
    /// Sum of both namespaces.
    pub total: u64,
}

/// Whether a thinking signature may be replayed to a given model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCompatibility {
    /// Minted by the target family.
    Compatible,
    /// Minted by another family; replaying it will be rejected upstream.
    Incompatible { cached: ModelFamily },
    /// Never seen, expired, or too short to have been cached.
    Unknown,
}

/// A signature observed while translating, waiting to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureCapture {
    /// Signature attached to a function call, keyed by the emitted tool_use id.
    Tool { id: String, signature: String },
    /// Signature attached to a thinking part.
    Thinking {
        signature: String,
        family: ModelFamily,
    },
}

impl SignatureCapture {
    pub fn namespace(&self) -> &'static str {
        match self {
            SignatureCapture::Tool { .. } => NAMESPACE_TOOL,
            SignatureCapture::Thinking { .. } => NAMESPACE_THINKING,
        }
    }

    pub fn signature(&self) -> &str {
        match self {
            SignatureCapture::Tool { signature, .. } => signature,
            SignatureCapture::Thinking { signature, .. } => signature,
        }
    }
}
