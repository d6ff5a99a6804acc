//! Observability infrastructure for the cost optimizer
//!
//! Provides:
//! - Prometheus metrics (analysis latency, inference latency, row and error counters, model version)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec, GaugeVec,
    Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for per-request analysis latency (in seconds)
const ANALYSIS_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Histogram buckets for per-row inference latency (in seconds)
const INFERENCE_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    analysis_latency_seconds: Histogram,
    inference_latency_seconds: Histogram,
    analyses_total: IntCounter,
    analysis_errors_total: IntCounterVec,
    rows_analyzed_total: IntCounter,
    unrecognized_labels_total: IntCounterVec,
    model_version_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            analysis_latency_seconds: register_histogram!(
                "cost_optimizer_analysis_latency_seconds",
                "Time spent parsing, classifying and aggregating one upload",
                ANALYSIS_BUCKETS.to_vec()
            )
            .expect("Failed to register analysis_latency_seconds"),

            inference_latency_seconds: register_histogram!(
                "cost_optimizer_inference_latency_seconds",
                "Time spent classifying a single observation",
                INFERENCE_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            analyses_total: register_int_counter!(
                "cost_optimizer_analyses_total",
                "Total number of completed analyses"
            )
            .expect("Failed to register analyses_total"),

            analysis_errors_total: register_int_counter_vec!(
                "cost_optimizer_analysis_errors_total",
                "Total number of failed analyses by error kind",
                &["kind"]
            )
            .expect("Failed to register analysis_errors_total"),

            rows_analyzed_total: register_int_counter!(
                "cost_optimizer_rows_analyzed_total",
                "Total number of usage rows classified"
            )
            .expect("Failed to register rows_analyzed_total"),

            unrecognized_labels_total: register_int_counter_vec!(
                "cost_optimizer_unrecognized_labels_total",
                "Predicted labels with no recommendation metadata",
                &["label"]
            )
            .expect("Failed to register unrecognized_labels_total"),

            model_version_info: register_gauge_vec!(
                "cost_optimizer_model_version_info",
                "Information about the loaded classifier",
                &["version", "kind"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics; clones share the same series.
#[derive(Clone)]
pub struct ServiceMetrics {
    inner: &'static ServiceMetricsInner,
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a handle, registering the metrics on first call
    pub fn new() -> Self {
        Self {
            inner: GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new),
        }
    }

    pub fn observe_analysis_latency(&self, duration_secs: f64) {
        self.inner.analysis_latency_seconds.observe(duration_secs);
    }

    pub fn observe_inference_latency(&self, duration_secs: f64) {
        self.inner.inference_latency_seconds.observe(duration_secs);
    }

    /// Record a completed analysis and the rows it covered
    pub fn record_analysis(&self, rows: usize) {
        self.inner.analyses_total.inc();
        self.inner.rows_analyzed_total.inc_by(rows as u64);
    }

    pub fn inc_analysis_errors(&self, kind: &str) {
        self.inner.analysis_errors_total.with_label_values(&[kind]).inc();
    }

    pub fn inc_unrecognized_label(&self, label: &str) {
        self.inner.unrecognized_labels_total.with_label_values(&[label]).inc();
    }

    /// Update model version info
    pub fn set_model_version(&self, version: &str, kind: &str) {
        self.inner.model_version_info.reset();
        self.inner
            .model_version_info
            .with_label_values(&[version, kind])
            .set(1.0);
    }

    pub fn analyses_total(&self) -> u64 {
        self.inner.analyses_total.get()
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    instance_name: String,
}

impl StructuredLogger {
    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn log_startup(&self, version: &str, model_version: &str, classifier_kind: &str) {
        info!(
            event = "service_started",
            instance = %self.instance_name,
            service_version = %version,
            model_version = %model_version,
            classifier = %classifier_kind,
            "Cost optimizer started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance_name,
            reason = %reason,
            "Cost optimizer shutting down"
        );
    }

    pub fn log_model_loaded(&self, path: &str, version: &str, classes: usize) {
        info!(
            event = "model_loaded",
            instance = %self.instance_name,
            path = %path,
            model_version = %version,
            classes = classes,
            "Classifier artifact loaded"
        );
    }

    pub fn log_analysis_completed(
        &self,
        rows: usize,
        recommendations: usize,
        total_cost: f64,
        total_savings: f64,
        elapsed_ms: u128,
    ) {
        info!(
            event = "analysis_completed",
            instance = %self.instance_name,
            rows = rows,
            recommendations = recommendations,
            total_cost = total_cost,
            total_savings = total_savings,
            elapsed_ms = elapsed_ms,
            "Analysis completed"
        );
    }

    pub fn log_upload_rejected(&self, kind: &str, reason: &str) {
        warn!(
            event = "upload_rejected",
            instance = %self.instance_name,
            kind = %kind,
            reason = %reason,
            "Upload rejected"
        );
    }

    /// Synthesized columns make results non-reproducible, so they are always logged
    pub fn log_columns_synthesized(&self, columns: &[&str], rows: usize) {
        if columns.is_empty() {
            return;
        }
        info!(
            event = "columns_synthesized",
            instance = %self.instance_name,
            columns = %columns.join(","),
            rows = rows,
            "Optional columns missing from upload, defaults synthesized"
        );
    }

    pub fn log_unrecognized_label(&self, label: &str, count: usize) {
        warn!(
            event = "unrecognized_label",
            instance = %self.instance_name,
            label = %label,
            count = count,
            "Predicted label has no recommendation metadata, dropped from report"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_metrics_handles_share_registry() {
        let metrics = ServiceMetrics::new();
        let before = metrics.analyses_total();

        metrics.observe_analysis_latency(0.01);
        metrics.observe_inference_latency(0.0001);
        metrics.record_analysis(3);
        metrics.inc_analysis_errors("missing_required_columns");
        metrics.inc_unrecognized_label("archive");
        metrics.set_model_version("fallback", "policy");

        let other = ServiceMetrics::new();
        assert!(other.analyses_total() > before);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance_name(), "test-instance");
        logger.log_columns_synthesized(&[], 0);
    }
}
