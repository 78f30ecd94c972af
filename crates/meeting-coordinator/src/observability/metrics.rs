//! Metrics definitions for the meeting coordinator.
//!
//! All metrics follow Prometheus naming conventions:
//! - `coordinator_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a tokio runtime, before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed)
/// or the listener cannot bind.
pub fn init_metrics_recorder(bind_address: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(bind_address)
        // Handlers are in-memory; anything past a few ms is suspicious
        .set_buckets_for_metric(
            Matcher::Prefix("coordinator_event".to_string()),
            &[
                0.0001, 0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250,
            ],
        )?
        .install()
}

// ============================================================================
// Registry Gauges
// ============================================================================

/// Metric: `coordinator_meetings_active`
pub fn set_meetings_active(count: usize) {
    // usize to f64 conversion is safe for realistic meeting counts (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    gauge!("coordinator_meetings_active").set(count as f64);
}

/// Metric: `coordinator_sessions_active`
pub fn set_sessions_active(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("coordinator_sessions_active").set(count as f64);
}

/// Set the number of events waiting in the intake queue.
///
/// Metric: `coordinator_queue_depth`
///
/// A steadily growing value means the worker is falling behind producers.
pub fn set_queue_depth(depth: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("coordinator_queue_depth").set(depth as f64);
}

// ============================================================================
// Event Processing
// ============================================================================

/// Record one handled event and its handler latency.
///
/// Metrics: `coordinator_events_processed_total`, `coordinator_event_duration_seconds`
/// Labels: `event_type`
pub fn record_event_processed(event_type: &'static str, duration: Duration) {
    counter!("coordinator_events_processed_total", "event_type" => event_type).increment(1);
    histogram!("coordinator_event_duration_seconds", "event_type" => event_type)
        .record(duration.as_secs_f64());
}

/// Record an event dropped because the queue stayed full past the timeout.
///
/// Metric: `coordinator_events_dropped_total`
/// Labels: `event_type`
///
/// Non-zero values indicate the worker is overloaded or stalled.
pub fn record_event_dropped(event_type: &'static str) {
    counter!("coordinator_events_dropped_total", "event_type" => event_type).increment(1);
}

/// Record a panic caught at the dispatch boundary.
///
/// Metric: `coordinator_handler_panics_total`
/// Labels: `event_type`
///
/// ALERT: Any non-zero value indicates a bug and should trigger investigation.
pub fn record_handler_panic(event_type: &'static str) {
    counter!("coordinator_handler_panics_total", "event_type" => event_type).increment(1);
}

/// Record a meeting removed from the registry.
///
/// Metric: `coordinator_meetings_removed_total`
/// Labels: `reason` (expired, never_started, ended_on_request)
pub fn record_meeting_removed(reason: &'static str) {
    counter!("coordinator_meetings_removed_total", "reason" => reason).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests execute the recording functions against the global no-op
    // recorder; they only check that nothing panics without one installed.

    #[test]
    fn test_gauges() {
        set_meetings_active(0);
        set_meetings_active(1_000);
        set_sessions_active(12);
        set_queue_depth(0);
        set_queue_depth(9_999);
    }

    #[test]
    fn test_event_counters() {
        record_event_processed("user_joined", Duration::from_micros(40));
        record_event_processed("remove_expired_meetings", Duration::from_millis(3));
        record_event_dropped("meeting_started");
        record_handler_panic("end_meeting");
    }

    #[test]
    fn test_record_meeting_removed() {
        record_meeting_removed("expired");
        record_meeting_removed("never_started");
        record_meeting_removed("ended_on_request");
    }
}
