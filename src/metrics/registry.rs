// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec_with_registry, CounterVec, Encoder, Opts, Registry, TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // TRANSLATION METRICS
    // ============================================================================

    /// Translated responses by stop reason
    pub static ref TRANSLATIONS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("translations_total", "Total Gemini responses translated"),
        &["stop_reason"],
        REGISTRY
    ).unwrap();

    /// Best-effort parse diagnostics
    pub static ref TRANSLATION_DIAGNOSTICS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("translation_diagnostics_total", "Degraded-input diagnostics raised while translating"),
        &["kind"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // TOKEN METRICS
    // ============================================================================

    /// Total tokens processed
    pub static ref TOKENS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("tokens_total", "Total tokens processed"),
        &["model", "type"], // type: input, output, cached_input
        REGISTRY
    ).unwrap();

    // ============================================================================
    // SIGNATURE CACHE METRICS
    // ============================================================================

    /// Signature cache operations
    pub static ref SIGNATURE_CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("signature_cache_operations_total", "Total thought-signature cache operations"),
        &["namespace", "operation", "outcome"], // outcome: hit, miss, stored, skipped, error
        REGISTRY
    ).unwrap();

    /// Signature writes dropped while translating
    pub static ref SIGNATURE_CACHE_WRITE_FAILURES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("signature_cache_write_failures_total", "Signature captures that could not be persisted"),
        &["namespace", "error"],
        REGISTRY
    ).unwrap();
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap_or_default();
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Vec collectors only show up once a label set has been touched
        SIGNATURE_CACHE_OPERATIONS
            .with_label_values(&["tool", "get", "miss"])
            .inc();
        TRANSLATIONS_TOTAL.with_label_values(&["end_turn"]).inc();

        let metrics = gather_metrics();
        assert!(metrics.contains("signature_cache_operations_total"));
        assert!(metrics.contains("translations_total"));
    }
}
