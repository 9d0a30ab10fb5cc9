//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define relay metrics (requests, upstream calls, webhook attempts)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `relay_requests_total` (counter): accepted requests by action
//! - `relay_upstream_calls_total` (counter): upstream calls by action, outcome
//! - `relay_upstream_duration_seconds` (histogram): upstream latency by action
//! - `relay_webhook_attempts_total` (counter): callback attempts by outcome
//! - `relay_webhook_deliveries_total` (counter): finished delivery sequences by outcome
//! - `relay_tracked_requests` (gauge): records held by the tracker
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests and
//!   library users pay nothing
//! - Labels are static strings; request ids never become labels

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("relay_requests_total", "Relay requests accepted");
    describe_counter!("relay_upstream_calls_total", "Calls made to the cert API");
    describe_histogram!(
        "relay_upstream_duration_seconds",
        "Cert API call latency in seconds"
    );
    describe_counter!("relay_webhook_attempts_total", "Individual callback POST attempts");
    describe_counter!(
        "relay_webhook_deliveries_total",
        "Callback delivery sequences by final outcome"
    );
    describe_gauge!("relay_tracked_requests", "Records held by the request tracker");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_relay_request(action: &'static str) {
    counter!("relay_requests_total", "action" => action).increment(1);
}

pub fn record_upstream_call(action: &'static str, outcome: &'static str, start: Instant) {
    counter!("relay_upstream_calls_total", "action" => action, "outcome" => outcome).increment(1);
    histogram!("relay_upstream_duration_seconds", "action" => action)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_webhook_attempt(outcome: &'static str) {
    counter!("relay_webhook_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_webhook_delivery(delivered: bool) {
    let outcome = if delivered { "sent" } else { "failed" };
    counter!("relay_webhook_deliveries_total", "outcome" => outcome).increment(1);
}

pub fn record_tracked_requests(count: usize) {
    gauge!("relay_tracked_requests").set(count as f64);
}
