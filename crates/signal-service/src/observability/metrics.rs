//! Prometheus metrics for the signaling service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `signal_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code, never by client input:
//! - `outcome`: joined, meeting_not_found, duplicate, closed, store_error, internal
//! - `kind`: offer, answer, candidate, chat
//! - `reason`: the `DropReason` labels plus transport drops (mailbox_full, not_attached)
//! - `event`: wire event names (~7 values)

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle used by `/metrics`.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Event handling is in-memory; anything above 100ms is pathological
        .set_buckets_for_metric(
            Matcher::Prefix("signal_event".to_string()),
            &[
                0.0005, 0.001, 0.0025, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250,
            ],
        )
        .map_err(|e| format!("Failed to set event latency buckets: {e}"))?
        // Meeting store calls may cross the network
        .set_buckets_for_metric(
            Matcher::Prefix("signal_store".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set store latency buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Gauges
// ============================================================================

/// Metric: `signal_participants_active`
pub fn set_participants_active(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("signal_participants_active").set(count as f64);
}

/// Metric: `signal_rooms_active`
///
/// Rooms with at least one joined participant.
pub fn set_rooms_active(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("signal_rooms_active").set(count as f64);
}

/// Metric: `signal_connections_active`
///
/// Open sockets, joined or not.
pub fn set_connections_active(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("signal_connections_active").set(count as f64);
}

/// Metric: `signal_actor_mailbox_depth`
/// Labels: `actor_type` (signaling, connection)
pub fn set_actor_mailbox_depth(actor_type: &str, depth: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("signal_actor_mailbox_depth", "actor_type" => actor_type.to_string())
        .set(depth as f64);
}

// ============================================================================
// Counters
// ============================================================================

/// Metric: `signal_joins_total`
/// Labels: `outcome`
pub fn record_join(outcome: &str) {
    counter!("signal_joins_total", "outcome" => outcome.to_string()).increment(1);
}

/// Metric: `signal_relays_total`
/// Labels: `kind`, `outcome` (delivered, dropped)
pub fn record_relay(kind: &str, outcome: &str) {
    counter!("signal_relays_total",
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Metric: `signal_deliveries_dropped_total`
/// Labels: `reason`
///
/// Non-zero `mailbox_full` means clients are not reading their sockets fast
/// enough.
pub fn record_delivery_dropped(reason: &str) {
    counter!("signal_deliveries_dropped_total", "reason" => reason.to_string()).increment(1);
}

/// Metric: `signal_store_errors_total`
/// Labels: `operation`
pub fn record_store_error(operation: &str) {
    counter!("signal_store_errors_total", "operation" => operation.to_string()).increment(1);
}

// ============================================================================
// Histograms
// ============================================================================

/// Metric: `signal_event_latency_seconds`
/// Labels: `event`
///
/// Time from receiving a client event to its transition completing,
/// including the meeting store lookup for joins.
pub fn record_event_latency(event: &str, duration: Duration) {
    histogram!("signal_event_latency_seconds", "event" => event.to_string())
        .record(duration.as_secs_f64());
}

/// Metric: `signal_store_latency_seconds`
/// Labels: `operation`
pub fn record_store_latency(operation: &str, duration: Duration) {
    histogram!("signal_store_latency_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}
