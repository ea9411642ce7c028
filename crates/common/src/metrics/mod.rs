//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all service metrics
pub const METRICS_PREFIX: &str = "lectorate";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
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

    // Comment lifecycle metrics
    describe_counter!(
        format!("{}_comments_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total comments accepted for moderation"
    );

    describe_counter!(
        format!("{}_comments_reviewed_total", METRICS_PREFIX),
        Unit::Count,
        "Total moderation decisions"
    );

    describe_counter!(
        format!("{}_comments_rate_limited_total", METRICS_PREFIX),
        Unit::Count,
        "Submissions rejected by the rolling-window quotas"
    );

    // Reaction metrics
    describe_counter!(
        format!("{}_reactions_total", METRICS_PREFIX),
        Unit::Count,
        "Total reaction toggles"
    );

    // Achievement metrics
    describe_counter!(
        format!("{}_achievements_awarded_total", METRICS_PREFIX),
        Unit::Count,
        "First-comment achievements handed to the notifier"
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

/// Record an accepted comment submission
pub fn record_comment_created(imported: bool) {
    counter!(
        format!("{}_comments_created_total", METRICS_PREFIX),
        "source" => if imported { "import" } else { "user" }
    )
    .increment(1);
}

/// Record a moderation decision
pub fn record_comment_reviewed(status: &str) {
    counter!(
        format!("{}_comments_reviewed_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a submission rejected by a quota window
pub fn record_rate_limited(window: &str) {
    counter!(
        format!("{}_comments_rate_limited_total", METRICS_PREFIX),
        "window" => window.to_string()
    )
    .increment(1);
}

/// Record a reaction toggle
pub fn record_reaction(kind: &str) {
    counter!(
        format!("{}_reactions_total", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a first-comment achievement handoff
pub fn record_achievement_awarded() {
    counter!(format!("{}_achievements_awarded_total", METRICS_PREFIX)).increment(1);
}
