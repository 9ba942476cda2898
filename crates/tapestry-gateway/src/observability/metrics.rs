//! Metrics definitions for the gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `tg_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! - `outcome`: 6 values (authorized plus one per `AuthError` variant)
//! - `status`: 2 values (success, error)
//! - `position`: bounded by the number of key sources (at most 5)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle used by `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Authorization decisions are dominated by cached-key verification
        .set_buckets_for_metric(
            Matcher::Prefix("tg_auth_decision".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set auth decision buckets: {e}"))?
        // JWKS fetches are network-bound and capped by the fetch timeout
        .set_buckets_for_metric(
            Matcher::Prefix("tg_jwks_fetch".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record the result of one request authorization.
///
/// Metric: `tg_auth_decisions_total`, `tg_auth_decision_duration_seconds`
/// Labels: `outcome`
pub fn record_auth_decision(outcome: &'static str, duration: Duration) {
    histogram!("tg_auth_decision_duration_seconds", "outcome" => outcome)
        .record(duration.as_secs_f64());
    counter!("tg_auth_decisions_total", "outcome" => outcome).increment(1);
}

/// Record one JWKS fetch against a key source.
///
/// Metric: `tg_jwks_fetch_total`, `tg_jwks_fetch_duration_seconds`
/// Labels: `status`
pub fn record_jwks_fetch(status: &'static str, duration: Duration) {
    histogram!("tg_jwks_fetch_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
    counter!("tg_jwks_fetch_total", "status" => status).increment(1);
}

/// Record which key source position verified a token.
///
/// Metric: `tg_key_source_hits_total`
/// Labels: `position`
///
/// Hits beyond position 0 mean earlier sources are failing, which is the
/// signal to watch during a tenant migration.
pub fn record_key_source_hit(position: usize) {
    counter!("tg_key_source_hits_total", "position" => position.to_string()).increment(1);
}
