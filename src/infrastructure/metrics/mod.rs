//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Registered live connection gauge
//! - Inbound command counts by message type and outcome
//! - Relay misses by message type
//! - Broadcast tick counts and per-connection write outcomes
//! - Buffer pool free/capacity gauges and miss counters

use std::collections::HashSet;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

use crate::infrastructure::network::all_pools_info;

const NAMESPACE: &str = "live_server";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Live connections currently present in the registry
pub static LIVE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("live_connections", "Number of registered live connections")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create LIVE_CONNECTIONS metric")
});

/// Inbound commands by message type and outcome
pub static COMMANDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("commands_total", "Inbound commands handled").namespace(NAMESPACE),
        &["message_type", "outcome"], // "ok", "rejected", "error"
    )
    .expect("Failed to create COMMANDS_TOTAL metric")
});

/// Relays dropped because the target session was not connected
pub static RELAY_MISSES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("relay_misses_total", "Relays whose target session was not found")
            .namespace(NAMESPACE),
        &["message_type"],
    )
    .expect("Failed to create RELAY_MISSES_TOTAL metric")
});

/// Broadcast ticks completed
pub static BROADCAST_TICKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("broadcast_ticks_total", "Completed broadcast ticks").namespace(NAMESPACE),
    )
    .expect("Failed to create BROADCAST_TICKS_TOTAL metric")
});

/// Broadcast writes by outcome
pub static BROADCAST_WRITES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("broadcast_writes_total", "Per-connection broadcast writes")
            .namespace(NAMESPACE),
        &["outcome"], // "delivered", "failed"
    )
    .expect("Failed to create BROADCAST_WRITES_TOTAL metric")
});

/// Buffer pool stats
pub static BUFFER_POOL_BUFFERS: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("buffer_pool_buffers", "Buffer pool statistics").namespace(NAMESPACE),
        &["pool", "state"], // "free", "capacity", "misses"
    )
    .expect("Failed to create BUFFER_POOL_BUFFERS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(LIVE_CONNECTIONS.clone()))
        .expect("Failed to register LIVE_CONNECTIONS");
    registry
        .register(Box::new(COMMANDS_TOTAL.clone()))
        .expect("Failed to register COMMANDS_TOTAL");
    registry
        .register(Box::new(RELAY_MISSES_TOTAL.clone()))
        .expect("Failed to register RELAY_MISSES_TOTAL");
    registry
        .register(Box::new(BROADCAST_TICKS_TOTAL.clone()))
        .expect("Failed to register BROADCAST_TICKS_TOTAL");
    registry
        .register(Box::new(BROADCAST_WRITES_TOTAL.clone()))
        .expect("Failed to register BROADCAST_WRITES_TOTAL");
    registry
        .register(Box::new(BUFFER_POOL_BUFFERS.clone()))
        .expect("Failed to register BUFFER_POOL_BUFFERS");
}

/// Collect and encode all metrics as Prometheus text format
///
/// Buffer pool gauges are refreshed from the pool directory first.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    refresh_buffer_pool_stats();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Helper to record an inbound command outcome
pub fn record_command(message_type: &str, outcome: &str) {
    COMMANDS_TOTAL
        .with_label_values(&[message_type, outcome])
        .inc();
}

/// Helper to count a relay whose target was not connected
pub fn record_relay_miss(message_type: &str) {
    RELAY_MISSES_TOTAL.with_label_values(&[message_type]).inc();
}

/// Helper to update the registered connection count
pub fn set_live_connections(count: usize) {
    LIVE_CONNECTIONS.set(count as i64);
}

/// Helper to record one completed broadcast tick
pub fn record_broadcast_tick(delivered: usize, failed: usize) {
    BROADCAST_TICKS_TOTAL.inc();
    BROADCAST_WRITES_TOTAL
        .with_label_values(&["delivered"])
        .inc_by(delivered as u64);
    BROADCAST_WRITES_TOTAL
        .with_label_values(&["failed"])
        .inc_by(failed as u64);
}

/// Pool names with series currently exported
static EXPORTED_POOLS: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

const POOL_STATES: [&str; 3] = ["free", "capacity", "misses"];

/// Helper to copy the buffer pool directory into gauges.
///
/// Series of pools that left the directory are removed.
pub fn refresh_buffer_pool_stats() {
    let mut exported = EXPORTED_POOLS.lock();
    let mut live = HashSet::new();

    for info in all_pools_info() {
        let values = [info.free_count, info.current_capacity, info.misses];
        for (state, value) in POOL_STATES.into_iter().zip(values) {
            BUFFER_POOL_BUFFERS
                .with_label_values(&[info.name.as_str(), state])
                .set(value as f64);
        }
        live.insert(info.name);
    }

    for gone in exported.difference(&live) {
        for state in POOL_STATES {
            // Absent series are fine
            let _ = BUFFER_POOL_BUFFERS.remove_label_values(&[gone.as_str(), state]);
        }
    }

    *exported = live;
}
