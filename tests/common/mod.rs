//! Shared utilities for integration testing.

#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use treasury_indexer::blockchain::{BlockchainError, BlockchainResult, ChainBlock, ChainSource, ChainTransaction};
use treasury_indexer::classification::{Classifier, RuleSet};
use treasury_indexer::config::ScannerConfig;
use treasury_indexer::scanner::BlockScanner;
use treasury_indexer::treasury::{
    BalanceCache, HistoryEntry, InMemoryStore, MetricsEngine, MetricsSettings, StoreError, StoreResult,
    TreasuryMetrics, TreasuryStore,
};

/// Scriptable in-memory chain.
///
/// Blocks that were never added come back empty; blocks marked as failing
/// return an RPC error until cleared.
#[derive(Default)]
pub struct MockChain {
    height: AtomicU64,
    blocks: Mutex<HashMap<u64, ChainBlock>>,
    failing: Mutex<HashSet<u64>>,
    missing: Mutex<HashSet<u64>>,
    balances: Mutex<HashMap<Address, U256>>,
    fail_height: Mutex<bool>,
    block_delay: Mutex<Option<Duration>>,
    block_calls: Mutex<Vec<u64>>,
}

impl MockChain {
    pub fn new(height: u64) -> Arc<Self> {
        let chain = Self::default();
        chain.height.store(height, Ordering::SeqCst);
        Arc::new(chain)
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    pub fn add_block(&self, number: u64, timestamp: u64, transactions: Vec<ChainTransaction>) {
        self.blocks.lock().unwrap().insert(
            number,
            ChainBlock {
                number,
                timestamp,
                transactions,
            },
        );
    }

    pub fn fail_block(&self, number: u64) {
        self.failing.lock().unwrap().insert(number);
    }

    pub fn heal_block(&self, number: u64) {
        self.failing.lock().unwrap().remove(&number);
    }

    /// Report the block as absent even though it is below the height.
    pub fn hide_block(&self, number: u64) {
        self.missing.lock().unwrap().insert(number);
    }

    /// Make every `block()` call sleep first, so concurrent callers interleave.
    pub fn delay_blocks(&self, delay: Duration) {
        *self.block_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_height(&self, fail: bool) {
        *self.fail_height.lock().unwrap() = fail;
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.balances.lock().unwrap().insert(address, balance);
    }

    /// Every block number requested, in call order.
    pub fn block_calls(&self) -> Vec<u64> {
        self.block_calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, number: u64) -> usize {
        self.block_calls().iter().filter(|n| **n == number).count()
    }
}

#[async_trait]
impl ChainSource for MockChain {
    async fn height(&self) -> BlockchainResult<u64> {
        if *self.fail_height.lock().unwrap() {
            return Err(BlockchainError::Rpc("height unavailable".into()));
        }
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn block(&self, number: u64) -> BlockchainResult<Option<ChainBlock>> {
        self.block_calls.lock().unwrap().push(number);
        let delay = *self.block_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(&number) {
            return Err(BlockchainError::Rpc(format!("block {number} unavailable")));
        }
        if self.missing.lock().unwrap().contains(&number) {
            return Ok(None);
        }
        let block = self.blocks.lock().unwrap().get(&number).cloned();
        Ok(Some(block.unwrap_or(ChainBlock {
            number,
            timestamp: number * 2,
            transactions: Vec::new(),
        })))
    }

    async fn balance(&self, address: Address) -> BlockchainResult<U256> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or(U256::ZERO))
    }
}

/// Store whose `append` fails for chosen transaction hashes.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    reject: Mutex<HashSet<TxHash>>,
}

impl FlakyStore {
    pub fn reject(&self, hash: TxHash) {
        self.reject.lock().unwrap().insert(hash);
    }
}

impl TreasuryStore for FlakyStore {
    fn append(&self, treasury: Address, entry: HistoryEntry) -> StoreResult<()> {
        if self.reject.lock().unwrap().contains(&entry.transaction.hash) {
            return Err(StoreError::Backend(format!("rejected {}", entry.transaction.hash)));
        }
        self.inner.append(treasury, entry)
    }

    fn history(&self, treasury: &Address) -> StoreResult<Vec<HistoryEntry>> {
        self.inner.history(treasury)
    }

    fn put_metrics(&self, metrics: TreasuryMetrics) -> StoreResult<()> {
        self.inner.put_metrics(metrics)
    }

    fn metrics(&self, treasury: &Address) -> StoreResult<Option<TreasuryMetrics>> {
        self.inner.metrics(treasury)
    }

    fn all_metrics(&self) -> StoreResult<Vec<TreasuryMetrics>> {
        self.inner.all_metrics()
    }

    fn last_processed_block(&self) -> StoreResult<Option<u64>> {
        self.inner.last_processed_block()
    }

    fn set_last_processed_block(&self, block: u64) -> StoreResult<()> {
        self.inner.set_last_processed_block(block)
    }
}

/// Plain value transfer.
pub fn transfer(seed: u8, from: Address, to: Address, value: U256) -> ChainTransaction {
    ChainTransaction {
        hash: TxHash::repeat_byte(seed),
        from,
        to: Some(to),
        value,
        input: Bytes::new(),
    }
}

/// Everything a scanner test needs to inspect afterwards.
pub struct Harness {
    pub chain: Arc<MockChain>,
    pub store: Arc<InMemoryStore>,
    pub balances: Arc<BalanceCache>,
    pub scanner: Arc<BlockScanner>,
}

pub fn harness(
    chain: Arc<MockChain>,
    rules: RuleSet,
    treasuries: Vec<Address>,
    config: ScannerConfig,
) -> Harness {
    harness_with_store(chain, Arc::new(InMemoryStore::new()), rules, treasuries, config)
}

pub fn harness_with_store(
    chain: Arc<MockChain>,
    store: Arc<InMemoryStore>,
    rules: RuleSet,
    treasuries: Vec<Address>,
    config: ScannerConfig,
) -> Harness {
    let balances = Arc::new(BalanceCache::new());
    let scanner = build_scanner(chain.clone(), store.clone(), balances.clone(), rules, treasuries, config);

    Harness {
        chain,
        store,
        balances,
        scanner,
    }
}

/// Scanner over any store backend.
pub fn build_scanner(
    chain: Arc<MockChain>,
    store: Arc<dyn TreasuryStore>,
    balances: Arc<BalanceCache>,
    rules: RuleSet,
    treasuries: Vec<Address>,
    config: ScannerConfig,
) -> Arc<BlockScanner> {
    let engine = MetricsEngine::new(store.clone(), balances.clone(), MetricsSettings::default());
    let scanner = BlockScanner::new(chain, Classifier::new(rules), engine, store, config)
        .with_registry(treasuries)
        .with_balance_cache(balances);
    Arc::new(scanner)
}

/// Scanner config that polls fast enough for tests.
pub fn fast_config() -> ScannerConfig {
    ScannerConfig {
        poll_interval_secs: 0,
        error_backoff_secs: 0,
        ..ScannerConfig::default()
    }
}

/// Wait until a condition is true or timeout.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
