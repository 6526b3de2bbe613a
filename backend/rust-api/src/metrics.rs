use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref ASSESSMENTS_GENERATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "assessments_generated_total",
        "Total number of assessment generation requests served",
        &["kind", "source"] // source: gemini | fallback | cache
    )
    .unwrap();

    pub static ref ASSESSMENTS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "assessments_submitted_total",
        "Total number of assessments submitted",
        &["kind"]
    )
    .unwrap();

    pub static ref QUESTION_SOURCE_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "question_source_failures_total",
        "Question source failures by reason",
        &["reason"]
    )
    .unwrap();

    pub static ref ANALYTICS_UPDATES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "analytics_updates_total",
        "Analytics derivations triggered by submissions",
        &["stage", "status"] // stage: pre | post
    )
    .unwrap();

    pub static ref INSIGHTS_GENERATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "insights_generated_total",
        "Analytics insight strings produced",
        &["source"] // gemini | fallback
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

pub fn record_generation(kind: &str, source: &str) {
    ASSESSMENTS_GENERATED_TOTAL
        .with_label_values(&[kind, source])
        .inc();
}

pub fn record_analytics_update(stage: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    ANALYTICS_UPDATES_TOTAL
        .with_label_values(&[stage, status])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Just verify that all metrics are properly registered
        let _ = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .get();
        let _ = ASSESSMENTS_GENERATED_TOTAL
            .with_label_values(&["pre", "cache"])
            .get();
    }

    #[test]
    fn test_render_metrics() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let result = render_metrics();
        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.contains("http_requests_total"));
    }
}
