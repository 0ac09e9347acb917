//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming conventions.

use metrics::{describe_counter, describe_histogram, Unit};

/// Metrics prefix for all DocChat metrics
pub const METRICS_PREFIX: &str = "docchat";

/// Register all metric descriptions
pub fn register_metrics() {
    // Ask pipeline metrics
    describe_counter!(
        format!("{}_asks_total", METRICS_PREFIX),
        Unit::Count,
        "Total questions answered"
    );

    describe_histogram!(
        format!("{}_inference_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end answering latency in seconds"
    );

    describe_counter!(
        format!("{}_inference_retries_total", METRICS_PREFIX),
        Unit::Count,
        "Transient inference failures that were retried"
    );

    describe_counter!(
        format!("{}_inference_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Terminal inference failures"
    );

    // Ingestion metrics
    describe_counter!(
        format!("{}_documents_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total documents stored from uploads and URLs"
    );

    describe_counter!(
        format!("{}_documents_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Documents that failed extraction"
    );
}
