//! Prometheus metrics for contract calls, feed fetches and market refreshes.
//!
//! Recorded through the `metrics` facade; the exporter is only installed by
//! `serve`, so CLI one-shots record into the no-op recorder.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Contract read latency metric name.
pub const METRIC_RPC_LATENCY: &str = "rpc_call_latency_ms";
/// Feed metadata fetch latency metric name.
pub const METRIC_FEED_FETCH_LATENCY: &str = "feed_fetch_latency_ms";
/// Market refresh latency metric name.
pub const METRIC_REFRESH_LATENCY: &str = "market_refresh_latency_ms";
/// Transactions sent counter metric name.
pub const METRIC_TX_SENT: &str = "transactions_sent_total";
/// Transactions failed counter metric name.
pub const METRIC_TX_FAILED: &str = "transactions_failed_total";
/// Feed cache hits counter metric name.
pub const METRIC_FEED_CACHE_HITS: &str = "feed_cache_hits_total";
/// Feed cache misses counter metric name.
pub const METRIC_FEED_CACHE_MISSES: &str = "feed_cache_misses_total";
/// Skipped refreshes counter metric name.
pub const METRIC_REFRESH_SKIPPED: &str = "market_refresh_skipped_total";
/// Markets currently listed gauge metric name.
pub const METRIC_MARKETS_LISTED: &str = "markets_listed";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(METRIC_RPC_LATENCY, "Contract read latency in milliseconds");
    describe_histogram!(
        METRIC_FEED_FETCH_LATENCY,
        "Feed metadata fetch latency in milliseconds"
    );
    describe_histogram!(
        METRIC_REFRESH_LATENCY,
        "Market list refresh latency in milliseconds"
    );

    describe_counter!(METRIC_TX_SENT, "Total number of transactions sent");
    describe_counter!(METRIC_TX_FAILED, "Total number of transactions that failed");
    describe_counter!(METRIC_FEED_CACHE_HITS, "Feed lists served from cache");
    describe_counter!(METRIC_FEED_CACHE_MISSES, "Feed lists fetched from upstream");
    describe_counter!(
        METRIC_REFRESH_SKIPPED,
        "Market refreshes skipped while in flight or debounced"
    );

    describe_gauge!(METRIC_MARKETS_LISTED, "Markets in the latest refresh");

    debug!("Metrics initialized");
}

/// Install the Prometheus recorder and register descriptions.
pub fn install_prometheus() -> Result<PrometheusHandle, String> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| e.to_string())?;
    init_metrics();
    Ok(handle)
}

/// Record feed fetch latency.
pub fn record_feed_fetch_latency(start: Instant, network: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_FEED_FETCH_LATENCY, "network" => network.to_string()).record(latency_ms);
}

/// Increment transactions sent counter.
pub fn inc_tx_sent(method: &'static str) {
    counter!(METRIC_TX_SENT, "method" => method).increment(1);
}

/// Increment transactions failed counter.
pub fn inc_tx_failed(method: &'static str) {
    counter!(METRIC_TX_FAILED, "method" => method).increment(1);
}

/// Increment feed cache hits counter.
pub fn inc_feed_cache_hits() {
    counter!(METRIC_FEED_CACHE_HITS).increment(1);
}

/// Increment feed cache misses counter.
pub fn inc_feed_cache_misses() {
    counter!(METRIC_FEED_CACHE_MISSES).increment(1);
}

/// Increment skipped refreshes counter.
pub fn inc_refresh_skipped(reason: &'static str) {
    counter!(METRIC_REFRESH_SKIPPED, "reason" => reason).increment(1);
}

/// Set the listed markets gauge.
pub fn set_markets_listed(count: usize) {
    gauge!(METRIC_MARKETS_LISTED).set(count as f64);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
    method: Option<&'static str>,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
            method: None,
        }
    }

    /// Create a latency timer labelled with a contract method.
    fn with_method(metric_name: &'static str, method: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
            method: Some(method),
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.elapsed_ms();
        match self.method {
            Some(method) => histogram!(self.metric_name, "method" => method).record(latency_ms),
            None => histogram!(self.metric_name).record(latency_ms),
        }
    }
}

/// Create a latency timer for a contract read.
pub fn timer_rpc(method: &'static str) -> LatencyTimer {
    LatencyTimer::with_method(METRIC_RPC_LATENCY, method)
}

/// Create a latency timer for a market refresh.
pub fn timer_refresh() -> LatencyTimer {
    LatencyTimer::new(METRIC_REFRESH_LATENCY)
}
