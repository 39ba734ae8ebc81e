// Signature cache manager - tool-call and thinking signature namespaces
// Author: kelexine (https://github.com/kelexine)
//
// Gemini requires thoughtSignatures to be replayed verbatim with the function
// calls and reasoning they belong to. Tool-call signatures are looked up by the
// tool_use id the client echoes back; thinking signatures are looked up by a
// hash of their own bytes, since clients resubmit thinking blocks without any
// id. Thinking records remember which model family minted them.

use crate::cache::models::{
    SignatureCacheStats, SignatureCapture, SignatureCompatibility, ThinkingSignatureRecord,
    FIELD_CACHED_AT, FIELD_FAMILY, NAMESPACE_THINKING, NAMESPACE_TOOL,
};
use crate::config::SignatureCacheConfig;
use crate::error::{ProxyError, Result};
use crate::metrics;
use crate::models::ModelFamily;
use crate::store::{KvStore, MemoryStore};
use crate::utils::logging::redact_signature;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::join_all;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Thought-signature cache over a shared key-value store.
///
/// Every write (re)sets the TTL; reads never extend it. Each store call is
/// bounded by the configured operation timeout, and dropping a returned
/// future cancels the call in flight.
#[derive(Clone)]
pub struct SignatureCache {
    store: Arc<dyn KvStore>,
    config: SignatureCacheConfig,
    ttl: Duration,
}

impl SignatureCache {
    pub fn new(store: Arc<dyn KvStore>, config: SignatureCacheConfig) -> Self {
        let ttl = config.ttl();
        Self { store, config, ttl }
    }

    /// Cache over a fresh in-process store with default settings.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), SignatureCacheConfig::default())
    }

    /// Override the retention window, e.g. with sub-second values in tests.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn min_signature_length(&self) -> usize {
        self.config.min_signature_length
    }

    /// Whether a signature is long enough to be trusted as a provenance token.
    pub fn is_valid_signature(&self, signature: &str) -> bool {
        signature.len() >= self.config.min_signature_length
    }

    fn tool_key(&self, tool_use_id: &str) -> String {
        format!("{}{}", self.config.tool_key_prefix, tool_use_id)
    }

    fn thinking_key(&self, signature: &str) -> String {
        format!(
            "{}{}",
            self.config.thinking_key_prefix,
            signature_digest(signature)
        )
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = self.config.operation_timeout();
        tokio::time::timeout(deadline, op)
            .await
            .map_err(|_| ProxyError::StoreTimeout(deadline))?
    }

    fn observe<T>(namespace: &str, operation: &str, result: &Result<T>, outcome: &str) {
        let outcome = if result.is_ok() { outcome } else { "error" };
        metrics::record_signature_op(namespace, operation, outcome);
    }

    // ============================================================================
    // TOOL NAMESPACE
    // ============================================================================

    /// Store the signature that came with a function call under its tool_use id.
    /// Signatures below the minimum length are ignored.
    pub async fn cache_tool_signature(&self, tool_use_id: &str, signature: &str) -> Result<()> {
        if tool_use_id.is_empty() || !self.is_valid_signature(signature) {
            debug!(
                "Skipping tool signature for tool_use_id: {:?} (sig length: {})",
                tool_use_id,
                signature.len()
            );
            metrics::record_signature_op(NAMESPACE_TOOL, "set", "skipped");
            return Ok(());
        }

        let key = self.tool_key(tool_use_id);
        let result = self
            .bounded(self.store.set_ex(&key, signature, self.ttl))
            .await;
        Self::observe(NAMESPACE_TOOL, "set", &result, "stored");
        if result.is_ok() {
            debug!(
                "Stored thoughtSignature for tool_use_id: {} ({})",
                tool_use_id,
                redact_signature(signature)
            );
        }
        result
    }

    pub async fn get_tool_signature(&self, tool_use_id: &str) -> Result<Option<String>> {
        let key = self.tool_key(tool_use_id);
        let result = self.bounded(self.store.get(&key)).await;
        let outcome = match &result {
            Ok(Some(_)) => "hit",
            _ => "miss",
        };
        Self::observe(NAMESPACE_TOOL, "get", &result, outcome);
        if let Ok(None) = result {
            debug!("No stored thoughtSignature for tool_use_id: {}", tool_use_id);
        }
        result
    }

    /// Returns whether an entry was removed.
    pub async fn clear_tool_signature(&self, tool_use_id: &str) -> Result<bool> {
        let key = self.tool_key(tool_use_id);
        let result = self.bounded(self.store.del(&[key])).await;
        Self::observe(NAMESPACE_TOOL, "clear", &result, "cleared");
        result.map(|removed| removed > 0)
    }

    // ============================================================================
    // THINKING NAMESPACE
    // ============================================================================

    /// Remember which model family produced a thinking signature.
    /// Signatures below the minimum length are ignored.
    pub async fn cache_thinking_signature(
        &self,
        signature: &str,
        family: ModelFamily,
    ) -> Result<()> {
        if !self.is_valid_signature(signature) {
            debug!(
                "Skipping thinking signature below minimum length (sig length: {})",
                signature.len()
            );
            metrics::record_signature_op(NAMESPACE_THINKING, "set", "skipped");
            return Ok(());
        }

        let key = self.thinking_key(signature);
        let cached_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let fields = [(FIELD_FAMILY, family.as_str()), (FIELD_CACHED_AT, cached_at.as_str())];
        let result = self
            .bounded(self.store.hset_ex(&key, &fields, self.ttl))
            .await;
        Self::observe(NAMESPACE_THINKING, "set", &result, "stored");
        if result.is_ok() {
            debug!(
                "Stored thinking signature {} for family {}",
                redact_signature(signature),
                family
            );
        }
        result
    }

    pub async fn get_thinking_signature_record(
        &self,
        signature: &str,
    ) -> Result<Option<ThinkingSignatureRecord>> {
        let key = self.thinking_key(signature);
        let result = self
            .bounded(self.store.hget_all(&key))
            .await
            .map(|fields| parse_record(&fields));
        let outcome = match &result {
            Ok(Some(_)) => "hit",
            _ => "miss",
        };
        Self::observe(NAMESPACE_THINKING, "get", &result, outcome);
        result
    }

    pub async fn get_thinking_signature_family(
        &self,
        signature: &str,
    ) -> Result<Option<ModelFamily>> {
        Ok(self
            .get_thinking_signature_record(signature)
            .await?
            .map(|record| record.family))
    }

    pub async fn is_thinking_signature_known(&self, signature: &str) -> Result<bool> {
        let key = self.thinking_key(signature);
        let result = self.bounded(self.store.exists(&key)).await;
        let outcome = match &result {
            Ok(true) => "hit",
            _ => "miss",
        };
        Self::observe(NAMESPACE_THINKING, "exists", &result, outcome);
        result
    }

    /// Returns whether an entry was removed.
    pub async fn clear_thinking_signature(&self, signature: &str) -> Result<bool> {
        let key = self.thinking_key(signature);
        let result = self.bounded(self.store.del(&[key])).await;
        Self::observe(NAMESPACE_THINKING, "clear", &result, "cleared");
        result.map(|removed| removed > 0)
    }

    /// Decide whether a thinking signature can be replayed to `target`.
    pub async fn check_thinking_signature(
        &self,
        signature: &str,
        target: ModelFamily,
    ) -> Result<SignatureCompatibility> {
        if !self.is_valid_signature(signature) {
            return Ok(SignatureCompatibility::Unknown);
        }
        Ok(match self.get_thinking_signature_family(signature).await? {
            None => SignatureCompatibility::Unknown,
            Some(cached) if cached == target => SignatureCompatibility::Compatible,
            Some(cached) => SignatureCompatibility::Incompatible { cached },
        })
    }

    // ============================================================================
    // ADMINISTRATION
    // ============================================================================

    /// Remove every entry of both namespaces. Returns the number removed.
    pub async fn clear_all(&self) -> Result<u64> {
        let tool = self.clear_prefix(&self.config.tool_key_prefix).await?;
        let thinking = self.clear_prefix(&self.config.thinking_key_prefix).await?;
        info!(
            "Cleared signature cache ({} tool, {} thinking entries)",
            tool, thinking
        );
        Ok(tool + thinking)
    }

    /// Count live entries per namespace.
    ///
    /// Counting walks the key space with a cursor scan. A backend may report a
    /// key twice while it is resizing, so treat the result as approximate on
    /// a busy shared store.
    pub async fn stats(&self) -> Result<SignatureCacheStats> {
        let tool = self.count_prefix(&self.config.tool_key_prefix).await?;
        let thinking = self.count_prefix(&self.config.thinking_key_prefix).await?;
        Ok(SignatureCacheStats {
            tool,
            thinking,
            total: tool + thinking,
        })
    }

    async fn clear_prefix(&self, prefix: &str) -> Result<u64> {
        let mut cursor = 0;
        let mut removed = 0;
        loop {
            let page = self
                .bounded(self.store.scan(cursor, prefix, self.config.scan_batch_size))
                .await?;
            if !page.keys.is_empty() {
                removed += self.bounded(self.store.del(&page.keys)).await?;
            }
            cursor = page.cursor;
            if cursor == 0 {
                return Ok(removed);
            }
        }
    }

    async fn count_prefix(&self, prefix: &str) -> Result<u64> {
        let mut cursor = 0;
        let mut count = 0;
        loop {
            let page = self
                .bounded(self.store.scan(cursor, prefix, self.config.scan_batch_size))
                .await?;
            count += page.keys.len() as u64;
            cursor = page.cursor;
            if cursor == 0 {
                return Ok(count);
            }
        }
    }

    // ============================================================================
    // TRANSLATION SIDE EFFECTS
    // ============================================================================

    /// Persist signatures captured during translation, best-effort.
    ///
    /// Writes run concurrently. Failures are logged and counted, never
    /// returned. Returns how many captures were written.
    pub async fn record_captures(&self, captures: &[SignatureCapture]) -> usize {
        let writes = captures.iter().map(|capture| async move {
            let result = match capture {
                SignatureCapture::Tool { id, signature } => {
                    self.cache_tool_signature(id, signature).await
                }
                SignatureCapture::Thinking { signature, family } => {
                    self.cache_thinking_signature(signature, *family).await
                }
            };
            (capture, result)
        });

        let mut stored = 0;
        for (capture, result) in join_all(writes).await {
            match result {
                Ok(()) => stored += 1,
                Err(e) => {
                    warn!(
                        "Dropping {} signature {}: {}",
                        capture.namespace(),
                        redact_signature(capture.signature()),
                        e
                    );
                    metrics::record_signature_write_failure(capture.namespace(), e.kind());
                }
            }
        }
        stored
    }
}

/// Lowercase hex SHA-256 of the signature bytes.
pub fn signature_digest(signature: &str) -> String {
    hex::encode(Sha256::digest(signature.as_bytes()))
}

fn parse_record(fields: &HashMap<String, String>) -> Option<ThinkingSignatureRecord> {
    if fields.is_empty() {
        return None;
    }

    let family = match fields.get(FIELD_FAMILY).map(|tag| tag.parse::<ModelFamily>()) {
        Some(Ok(family)) => family,
        _ => {
            warn!(
                "Unreadable family on cached thinking signature: {:?}",
                fields.get(FIELD_FAMILY)
            );
            ModelFamily::Unknown
        }
    };
    let cached_at = fields
        .get(FIELD_CACHED_AT)
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc));

    Some(ThinkingSignatureRecord { family, cached_at })
}
