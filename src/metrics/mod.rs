// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics, SIGNATURE_CACHE_OPERATIONS, SIGNATURE_CACHE_WRITE_FAILURES, TOKENS_TOTAL,
    TRANSLATIONS_TOTAL, TRANSLATION_DIAGNOSTICS,
};

/// Helper to record a translated response
pub fn record_translation(stop_reason: &str) {
    TRANSLATIONS_TOTAL.with_label_values(&[stop_reason]).inc();
}

/// Helper to record a degraded-input diagnostic
pub fn record_diagnostic(kind: &str) {
    TRANSLATION_DIAGNOSTICS.with_label_values(&[kind]).inc();
}

/// Helper to record token usage
pub fn record_tokens(model: &str, input: u32, output: u32, cached_input: u32) {
    if input > 0 {
        TOKENS_TOTAL
            .with_label_values(&[model, "input"])
            .inc_by(input as f64);
    }
    if output > 0 {
        TOKENS_TOTAL
            .with_label_values(&[model, "output"])
            .inc_by(output as f64);
    }
    if cached_input > 0 {
        TOKENS_TOTAL
            .with_label_values(&[model, "cached_input"])
            .inc_by(cached_input as f64);
    }
}

/// Helper to record signature cache operations
pub fn record_signature_op(namespace: &str, operation: &str, outcome: &str) {
    SIGNATURE_CACHE_OPERATIONS
        .with_label_values(&[namespace, operation, outcome])
        .inc();
}

/// Helper to record a signature capture lost during translation
pub fn record_signature_write_failure(namespace: &str, error: &str) {
    SIGNATURE_CACHE_WRITE_FAILURES
        .with_label_values(&[namespace, error])
        .inc();
}
