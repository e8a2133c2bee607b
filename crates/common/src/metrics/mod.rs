//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming for request handling, the
//! dual-mode store, the generation pipeline, and billing webhooks.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all StudyHall metrics
pub const METRICS_PREFIX: &str = "studyhall";

/// Histogram buckets for request latency (in seconds); generation requests
/// sit behind model calls, so the tail stretches well past typical CRUD
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
    60.00, // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_store_operations_total", METRICS_PREFIX),
        Unit::Count,
        "Store operations by entity, persistence mode, and operation"
    );

    describe_counter!(
        format!("{}_generations_total", METRICS_PREFIX),
        Unit::Count,
        "Content generation requests by artifact kind and outcome"
    );

    describe_counter!(
        format!("{}_ai_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Upstream model API requests"
    );

    describe_histogram!(
        format!("{}_ai_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Upstream model call latency in seconds"
    );

    describe_counter!(
        format!("{}_pdf_pages_extracted_total", METRICS_PREFIX),
        Unit::Count,
        "Pages extracted from uploaded PDFs"
    );

    describe_counter!(
        format!("{}_billing_events_total", METRICS_PREFIX),
        Unit::Count,
        "Billing webhook events by type and outcome"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one dual-mode store operation
pub fn record_store_op(entity: &'static str, mode: &'static str, op: &'static str) {
    counter!(
        format!("{}_store_operations_total", METRICS_PREFIX),
        "entity" => entity,
        "mode" => mode,
        "op" => op
    )
    .increment(1);
}

/// Record a generation request outcome
pub fn record_generation(content_type: &'static str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    counter!(
        format!("{}_generations_total", METRICS_PREFIX),
        "content_type" => content_type,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record an upstream model call
pub fn record_ai_call(model: &str, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_ai_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_ai_request_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}

/// Record pages extracted from an uploaded PDF
pub fn record_pdf_extraction(pages: usize) {
    counter!(format!("{}_pdf_pages_extracted_total", METRICS_PREFIX)).increment(pages as u64);
}

/// Record a billing webhook event
pub fn record_billing_event(event_type: &str, handled: bool) {
    let outcome = if handled { "handled" } else { "ignored" };
    counter!(
        format!("{}_billing_events_total", METRICS_PREFIX),
        "event" => event_type.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("POST", "/generate-content");
        metrics.finish(200);
        // Just verify it runs without panic
    }
}
