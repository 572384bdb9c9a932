//! Treasury indexer service.
//!
//! # Architecture Overview
//!
//! ```text
//!   Base RPC ──▶ blockchain::BlockchainClient ──▶ scanner::BlockScanner
//!                                                   │
//!                          ┌────────────────────────┤
//!                          ▼                        ▼
//!            classification::Classifier   treasury::BalanceCache
//!                          │                        │
//!                          └──────────▶ treasury::MetricsEngine ──▶ TreasuryStore
//!
//!   Cross-cutting: config, observability (logs + Prometheus), lifecycle
//! ```

use alloy::primitives::Address;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use treasury_indexer::blockchain::BlockchainClient;
use treasury_indexer::classification::{Classifier, RuleSet};
use treasury_indexer::config::loader::{load_with_overrides, ConfigOverrides};
use treasury_indexer::config::{ConfigError, IndexerConfig};
use treasury_indexer::lifecycle::{spawn_signal_handler, Shutdown};
use treasury_indexer::observability::{logging, metrics};
use treasury_indexer::scanner::BlockScanner;
use treasury_indexer::treasury::{BalanceCache, InMemoryStore, MetricsEngine, TreasuryStore};

const DEFAULT_CONFIG_PATH: &str = "indexer.toml";

#[derive(Parser)]
#[command(name = "treasury-indexer")]
#[command(about = "Classifies treasury transactions on Base and tracks runway", long_about = None)]
struct Cli {
    /// Config file; defaults are used when the default path does not exist.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Classification rules file, overrides `rules.path`.
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Treasury address to watch, in addition to the configured ones.
    #[arg(short, long = "treasury")]
    treasuries: Vec<String>,

    /// RPC endpoint, overrides config and BASE_RPC_URL.
    #[arg(long)]
    rpc_url: Option<String>,
}

fn load(cli: &Cli) -> Result<IndexerConfig, ConfigError> {
    let path = if cli.config.exists() {
        Some(cli.config.as_path())
    } else if cli.config == Path::new(DEFAULT_CONFIG_PATH) {
        None
    } else {
        return Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("config file {} not found", cli.config.display()),
        )));
    };

    let overrides = ConfigOverrides {
        rpc_url: cli.rpc_url.clone(),
        rules_path: cli.rules.as_ref().map(|p| p.display().to_string()),
        treasuries: cli.treasuries.clone(),
    };
    load_with_overrides(path, &overrides)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    logging::init_logging(&config.observability);
    tracing::info!("treasury-indexer v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let treasuries = config
        .treasuries
        .iter()
        .map(|t| t.parse::<Address>())
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(
        rpc_url = %config.chain.rpc_url,
        chain_id = config.chain.chain_id,
        treasuries = treasuries.len(),
        poll_interval_secs = config.scanner.poll_interval_secs,
        "Configuration loaded"
    );

    let snapshot = match &config.store.snapshot_path {
        Some(path) => InMemoryStore::load_from_file(path)?,
        None => InMemoryStore::new(),
    };
    let snapshot = Arc::new(snapshot);
    let store: Arc<dyn TreasuryStore> = snapshot.clone();

    let balances = Arc::new(BalanceCache::new());
    let classifier = Classifier::new(RuleSet::load(&config.rules.path));
    let engine = MetricsEngine::new(store.clone(), balances.clone(), (&config.metrics).into());
    let chain = Arc::new(BlockchainClient::new(config.chain.clone()).await?);

    let scanner = Arc::new(
        BlockScanner::new(chain, classifier, engine, store, config.scanner.clone())
            .with_registry(treasuries)
            .with_balance_cache(balances),
    );
    scanner.start();

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_handler(shutdown.clone());
    shutdown.wait().await;

    scanner.stop();
    scanner.wait_stopped().await;

    if let Err(e) = snapshot.save_to_file() {
        tracing::error!(error = %e, "Failed to save store snapshot");
    }

    tracing::info!(status = ?scanner.status(), "Shutdown complete");
    Ok(())
}
