// Thought-signature continuity cache
// Author: kelexine (https://github.com/kelexine)

pub mod manager;
pub mod models;

pub use manager::SignatureCache;
pub use models::{
    SignatureCacheStats, SignatureCapture, SignatureCompatibility, ThinkingSignatureRecord,
};
