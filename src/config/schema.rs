//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the indexer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the treasury indexer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IndexerConfig {
    /// Chain RPC settings.
    pub chain: ChainConfig,

    /// Block scanner settings.
    pub scanner: ScannerConfig,

    /// Treasury addresses watched from boot (the static registry).
    pub treasuries: Vec<String>,

    /// Classification rule source.
    pub rules: RulesConfig,

    /// Rolling metrics settings.
    pub metrics: MetricsConfig,

    /// History/metrics store settings.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Chain data source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Expected chain ID (8453 for Base mainnet).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Retry attempts after the first failed round across all providers.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://mainnet.base.org".to_string(),
            failover_urls: Vec::new(),
            chain_id: 8453,
            rpc_timeout_secs: 10,
            max_retries: 2,
            retry_base_delay_ms: 250,
            retry_max_delay_ms: 2000,
        }
    }
}

/// Block scanner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Sleep between successful poll cycles.
    pub poll_interval_secs: u64,

    /// Sleep after a failed poll cycle.
    pub error_backoff_secs: u64,

    /// Blocks before the current head to process on a first run.
    /// Zero processes only the head block.
    pub backfill_blocks: u64,

    /// Exact first block to process on a first run (overrides `backfill_blocks`).
    pub start_block: Option<u64>,

    /// Consecutive fetch failures tolerated for one block before it is skipped.
    pub max_block_attempts: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            error_backoff_secs: 10,
            backfill_blocks: 0,
            start_block: None,
            max_block_attempts: 3,
        }
    }
}

/// Classification rules source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Path to the TOML rules file. Built-in defaults are used when unreadable.
    pub path: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: "classification/rules.toml".to_string(),
        }
    }
}

/// Rolling metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Trailing window for burn rate, in days.
    pub window_days: u64,

    /// Maximum number of top recipients kept per treasury.
    pub top_recipients: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            top_recipients: 10,
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot file loaded at boot and written at shutdown.
    pub snapshot_path: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
