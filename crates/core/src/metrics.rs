//! Metrics definitions for the API.
//!
//! This module defines all metrics used throughout the service.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "access_denied_total",
        "Total number of operations rejected by the ownership guard or personal-data checks"
    );
    describe_counter!(
        "invalid_cursor_total",
        "Total number of supplied cursors that failed to decode and were ignored"
    );
    describe_counter!(
        "visibility_refetch_total",
        "Total number of extra storage fetches needed to fill a page after visibility filtering"
    );
    describe_histogram!(
        "graphql_request_duration_seconds",
        "Time taken to execute a GraphQL request in seconds"
    );
}

/// Record a denied operation.
///
/// # Arguments
/// * `operation` - The operation that was denied (e.g. "update_studyset")
pub fn record_access_denied(operation: &'static str) {
    counter!("access_denied_total", "operation" => operation).increment(1);
}

/// Record a cursor that failed to decode.
///
/// # Arguments
/// * `shape` - The cursor shape the caller expected ("recency", "ranked" or "id")
pub fn record_invalid_cursor(shape: &'static str) {
    counter!("invalid_cursor_total", "shape" => shape).increment(1);
}

/// Record an extra fetch made to replace rows dropped by the visibility policy.
pub fn record_visibility_refetch() {
    counter!("visibility_refetch_total").increment(1);
}

/// Record GraphQL request duration.
pub fn record_request_duration(duration_secs: f64) {
    histogram!("graphql_request_duration_seconds").record(duration_secs);
}

/// A timer that automatically records request duration when dropped.
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    /// Start a new request timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for RequestTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_request_duration(duration);
    }
}
