//! Block scanner: polls the chain, filters treasury transactions and feeds
//! them through the classifier and the metrics engine.
//!
//! # Cycle
//! ```text
//! height() → first run? pick the first block (head, backfill or start_block)
//!          → for n in (last, height]: block(n) → filter → classify → record
//!          → advance progress per block
//!          → sleep poll_interval (error_backoff after a failed height query)
//! ```
//!
//! A block that fails to load halts the cycle; progress stays just below it
//! and the next cycle retries it. After `max_block_attempts` failures the
//! block is recorded as skipped so the scanner cannot stall forever.

use alloy::primitives::Address;
use dashmap::DashSet;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::blockchain::source::ChainSource;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::classification::Classifier;
use crate::config::ScannerConfig;
use crate::observability::metrics;
use crate::scanner::state::{AtomicState, ScannerError, ScannerState};
use crate::treasury::balance::BalanceCache;
use crate::treasury::engine::MetricsEngine;
use crate::treasury::store::TreasuryStore;
use crate::treasury::types::{Transaction, TreasuryMetrics};
use crate::treasury::units::to_whole_tokens;

#[derive(Debug, Default)]
struct Progress {
    last_processed: Option<u64>,
    /// Block currently being retried and its failure count.
    failing: Option<(u64, u32)>,
    skipped: Vec<u64>,
}

/// Point-in-time view of the scanner for supervisors and logs.
#[derive(Debug, Clone, Serialize)]
pub struct ScannerStatus {
    pub state: &'static str,
    pub last_processed_block: Option<u64>,
    pub watched_treasuries: usize,
    pub skipped_blocks: Vec<u64>,
}

/// The indexer's single worker.
pub struct BlockScanner {
    chain: Arc<dyn ChainSource>,
    classifier: Classifier,
    engine: MetricsEngine,
    store: Arc<dyn TreasuryStore>,
    balances: Option<Arc<BalanceCache>>,
    config: ScannerConfig,
    watched: DashSet<Address>,
    state: AtomicState,
    wake: Notify,
    progress: Mutex<Progress>,
    /// Held for the whole of a poll cycle.
    cycle: AsyncMutex<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BlockScanner {
    /// `store` must be the same store the engine writes to; it also holds scan progress.
    pub fn new(
        chain: Arc<dyn ChainSource>,
        classifier: Classifier,
        engine: MetricsEngine,
        store: Arc<dyn TreasuryStore>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            chain,
            classifier,
            engine,
            store,
            balances: None,
            config,
            watched: DashSet::new(),
            state: AtomicState::new(ScannerState::Stopped),
            wake: Notify::new(),
            progress: Mutex::new(Progress::default()),
            cycle: AsyncMutex::new(()),
            task: Mutex::new(None),
        }
    }

    /// Initial watched set.
    pub fn with_registry(self, treasuries: Vec<Address>) -> Self {
        for address in treasuries {
            self.watched.insert(address);
        }
        self
    }

    /// Keep this cache fresh with balances of treasuries touched by each block.
    pub fn with_balance_cache(mut self, cache: Arc<BalanceCache>) -> Self {
        self.balances = Some(cache);
        self
    }

    // ---- lifecycle ----

    /// Start polling. No-op while already starting or running; cancels a
    /// pending stop. Must be called inside a tokio runtime.
    pub fn start(self: &Arc<Self>) {
        if let Err(current) = self.state.transition(ScannerState::Stopped, ScannerState::Starting) {
            if current == ScannerState::Stopping
                && self
                    .state
                    .transition(ScannerState::Stopping, ScannerState::Running)
                    .is_ok()
            {
                tracing::info!("Pending stop cancelled, scanner keeps running");
            } else {
                tracing::debug!(state = %current, "Scanner already started");
            }
            return;
        }

        self.announce_treasuries();
        self.restore_progress();

        if self
            .state
            .transition(ScannerState::Starting, ScannerState::Running)
            .is_err()
        {
            tracing::info!("Stop requested during startup");
        }

        let scanner = Arc::clone(self);
        let handle = tokio::spawn(async move { scanner.run().await });
        if let Ok(mut task) = self.task.lock() {
            *task = Some(handle);
        }
    }

    /// Request a stop. The current cycle finishes first. No-op when stopped.
    pub fn stop(&self) {
        for from in [ScannerState::Running, ScannerState::Starting] {
            if self.state.transition(from, ScannerState::Stopping).is_ok() {
                tracing::info!("Scanner stop requested");
                self.wake.notify_one();
                return;
            }
        }
    }

    /// Wait for the polling task to exit.
    pub async fn wait_stopped(&self) {
        let handle = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Scanner task ended abnormally");
                self.state.store(ScannerState::Stopped);
            }
        }
    }

    pub fn state(&self) -> ScannerState {
        self.state.load()
    }

    async fn run(self: Arc<Self>) {
        tracing::info!(
            poll_interval_secs = self.config.poll_interval_secs,
            treasuries = self.watched.len(),
            "Block scanner running"
        );

        loop {
            if self.state() != ScannerState::Running
                && self
                    .state
                    .transition(ScannerState::Stopping, ScannerState::Stopped)
                    .is_ok()
            {
                break;
            }

            let delay = match self.poll_once().await {
                Ok(_) => Duration::from_secs(self.config.poll_interval_secs),
                Err(e) => {
                    tracing::error!(error = %e, "Error polling blocks");
                    metrics::record_poll_error();
                    Duration::from_secs(self.config.error_backoff_secs)
                }
            };

            tokio::select! {
                _ = sleep(delay) => {}
                _ = self.wake.notified() => {}
            }
        }

        tracing::info!(last_processed_block = ?self.last_processed_block(), "Block scanner stopped");
    }

    // ---- polling ----

    /// Run one poll cycle. Returns the number of blocks advanced past.
    ///
    /// Errors are poll-level (height query) failures; block failures are
    /// handled inside and only shorten the cycle. Concurrent calls run one
    /// after the other.
    pub async fn poll_once(&self) -> BlockchainResult<u64> {
        let _cycle = self.cycle.lock().await;

        let height = match self.chain.height().await {
            Ok(height) => {
                metrics::record_rpc_health(true);
                height
            }
            Err(e) => {
                metrics::record_rpc_health(false);
                return Err(e);
            }
        };
        metrics::record_chain_height(height);

        let first = match self.last_processed_block() {
            Some(last) => last.saturating_add(1),
            None => {
                let first = self.first_block(height);
                tracing::info!(height, first_block = first, "No stored progress, starting scan");
                first
            }
        };

        if first > height {
            return Ok(0);
        }

        tracing::debug!(from = first, to = height, "Processing blocks");

        let mut advanced = 0;
        for number in first..=height {
            match self.process_block(number).await {
                Ok(()) => {
                    self.set_progress(number);
                    advanced += 1;
                }
                Err(e) => {
                    if self.register_block_failure(number, &e) {
                        self.set_progress(number);
                        advanced += 1;
                        continue;
                    }
                    break;
                }
            }
        }
        Ok(advanced)
    }

    /// First block to scan when nothing has been processed yet. A pinned
    /// start block above the head is waited for.
    fn first_block(&self, height: u64) -> u64 {
        match self.config.start_block {
            Some(start) => start,
            None => height.saturating_sub(self.config.backfill_blocks),
        }
    }

    async fn process_block(&self, number: u64) -> BlockchainResult<()> {
        let block = self
            .chain
            .block(number)
            .await?
            .ok_or(BlockchainError::MissingBlock(number))?;

        let mut touched = BTreeSet::new();
        for chain_tx in &block.transactions {
            let from_watched = self.watched.contains(&chain_tx.from);
            let to_watched = chain_tx.to.is_some_and(|to| self.watched.contains(&to));
            if !from_watched && !to_watched {
                continue;
            }

            let tx = Transaction::from_chain(&block, chain_tx);
            self.process_transaction(&tx);

            if from_watched {
                touched.insert(chain_tx.from);
            }
            if let Some(to) = chain_tx.to.filter(|_| to_watched) {
                touched.insert(to);
            }
        }

        self.refresh_balances(&touched).await;
        metrics::record_block_processed();
        Ok(())
    }

    fn process_transaction(&self, tx: &Transaction) {
        let category = self.classifier.classify(tx);
        match self.engine.record(tx, category) {
            Ok(_) => {
                metrics::record_transaction(category.as_str());
                tracing::info!(
                    tx_hash = %tx.hash,
                    block = tx.block_number,
                    from = %tx.from,
                    category = %category,
                    value = to_whole_tokens(tx.value),
                    "Processed treasury transaction"
                );
            }
            Err(e) => {
                metrics::record_transaction_error();
                tracing::error!(tx_hash = %tx.hash, error = %e, "Error processing transaction");
            }
        }
    }

    async fn refresh_balances(&self, treasuries: &BTreeSet<Address>) {
        let Some(cache) = &self.balances else {
            return;
        };

        for treasury in treasuries {
            match self.chain.balance(*treasury).await {
                Ok(balance) => {
                    cache.update(*treasury, balance);
                    if let Err(e) = self.engine.refresh(treasury) {
                        tracing::error!(treasury = %treasury, error = %e, "Failed to refresh metrics");
                    }
                }
                Err(e) => {
                    tracing::warn!(treasury = %treasury, error = %e, "Failed to refresh balance");
                }
            }
        }
    }

    /// Count a failure for `number`. Returns true when the block is given up on.
    fn register_block_failure(&self, number: u64, error: &BlockchainError) -> bool {
        metrics::record_block_failure();
        let Ok(mut progress) = self.progress.lock() else {
            return false;
        };

        let attempts = match progress.failing {
            Some((block, n)) if block == number => n + 1,
            _ => 1,
        };

        if attempts >= self.config.max_block_attempts {
            progress.failing = None;
            progress.skipped.push(number);
            metrics::record_block_skipped();
            tracing::error!(block = number, attempts, error = %error, "Giving up on block, skipping it");
            return true;
        }

        progress.failing = Some((number, attempts));
        tracing::error!(
            block = number,
            attempts,
            error = %error,
            "Error processing block, will retry next cycle"
        );
        false
    }

    /// Advance progress; never moves backwards.
    fn set_progress(&self, block: u64) {
        let Ok(mut progress) = self.progress.lock() else {
            return;
        };
        if progress.last_processed.is_some_and(|last| last >= block) {
            return;
        }
        progress.last_processed = Some(block);
        if progress.failing.is_some_and(|(failing, _)| failing <= block) {
            progress.failing = None;
        }
        drop(progress);

        metrics::record_last_processed_block(block);
        if let Err(e) = self.store.set_last_processed_block(block) {
            tracing::warn!(block, error = %e, "Failed to persist scan progress");
        }
    }

    fn restore_progress(&self) {
        match self.store.last_processed_block() {
            Ok(Some(block)) => {
                tracing::info!(last_processed_block = block, "Resuming from stored progress");
                self.set_progress(block);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read stored progress"),
        }
    }

    fn announce_treasuries(&self) {
        metrics::record_watched_treasuries(self.watched.len());
        tracing::info!(count = self.watched.len(), "Watching treasuries");
    }

    // ---- registry & queries ----

    /// Watch another treasury without restarting.
    pub fn add_treasury(&self, address: &str) -> Result<Address, ScannerError> {
        let parsed = parse_address(address)?;
        if self.watched.insert(parsed) {
            metrics::record_watched_treasuries(self.watched.len());
            tracing::info!(treasury = %parsed, "Added treasury");
        }
        Ok(parsed)
    }

    /// Watched addresses in ascending order.
    pub fn watched_treasuries(&self) -> Vec<Address> {
        let mut all: Vec<Address> = self.watched.iter().map(|r| *r).collect();
        all.sort();
        all
    }

    pub fn last_processed_block(&self) -> Option<u64> {
        self.progress.lock().ok().and_then(|p| p.last_processed)
    }

    /// Blocks abandoned after repeated failures.
    pub fn skipped_blocks(&self) -> Vec<u64> {
        self.progress
            .lock()
            .map(|p| p.skipped.clone())
            .unwrap_or_default()
    }

    /// Metrics for an address; `Ok(None)` means nothing observed yet.
    pub fn get_metrics(&self, address: &str) -> Result<Option<TreasuryMetrics>, ScannerError> {
        let parsed = parse_address(address)?;
        Ok(self.engine.get(&parsed)?)
    }

    /// Like [`get_metrics`](Self::get_metrics) but absent data is an error.
    pub fn require_metrics(&self, address: &str) -> Result<TreasuryMetrics, ScannerError> {
        self.get_metrics(address)?
            .ok_or_else(|| ScannerError::NotFound(address.to_string()))
    }

    pub fn get_all_metrics(&self) -> Result<Vec<TreasuryMetrics>, ScannerError> {
        Ok(self.engine.get_all()?)
    }

    pub fn status(&self) -> ScannerStatus {
        ScannerStatus {
            state: self.state().as_str(),
            last_processed_block: self.last_processed_block(),
            watched_treasuries: self.watched.len(),
            skipped_blocks: self.skipped_blocks(),
        }
    }
}

fn parse_address(address: &str) -> Result<Address, ScannerError> {
    address
        .trim()
        .parse()
        .map_err(|_| ScannerError::InvalidAddress(address.to_string()))
}
