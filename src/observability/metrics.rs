//! Metrics collection and exposition.
//!
//! # Metrics
//! - `indexer_chain_height` (gauge): last observed chain height
//! - `indexer_last_processed_block` (gauge): scanner progress
//! - `indexer_blocks_processed_total` (counter)
//! - `indexer_block_failures_total` (counter): failed block fetches
//! - `indexer_blocks_skipped_total` (counter): blocks given up on
//! - `indexer_poll_errors_total` (counter): failed poll cycles
//! - `indexer_transactions_total` (counter): matched transactions by category
//! - `indexer_transaction_errors_total` (counter): per-transaction failures
//! - `indexer_watched_treasuries` (gauge)
//! - `indexer_rpc_healthy` (gauge): 1 after a successful height query, 0 after a failed one

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter. Must run inside the tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_chain_height(height: u64) {
    gauge!("indexer_chain_height").set(height as f64);
}

pub fn record_last_processed_block(block: u64) {
    gauge!("indexer_last_processed_block").set(block as f64);
}

pub fn record_block_processed() {
    counter!("indexer_blocks_processed_total").increment(1);
}

pub fn record_block_failure() {
    counter!("indexer_block_failures_total").increment(1);
}

pub fn record_block_skipped() {
    counter!("indexer_blocks_skipped_total").increment(1);
}

pub fn record_poll_error() {
    counter!("indexer_poll_errors_total").increment(1);
}

pub fn record_transaction(category: &'static str) {
    counter!("indexer_transactions_total", "category" => category).increment(1);
}

pub fn record_transaction_error() {
    counter!("indexer_transaction_errors_total").increment(1);
}

pub fn record_watched_treasuries(count: usize) {
    gauge!("indexer_watched_treasuries").set(count as f64);
}

pub fn record_rpc_health(healthy: bool) {
    gauge!("indexer_rpc_healthy").set(if healthy { 1.0 } else { 0.0 });
}
