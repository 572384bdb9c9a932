//! Treasury history and metrics storage.
//!
//! The engine only talks to [`TreasuryStore`]; the in-memory backing here can
//! be swapped for an embedded or external database without touching engine
//! logic. Scan progress lives in the same store so a restart resumes where the
//! previous run stopped.

use alloy::primitives::Address;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::treasury::types::{HistoryEntry, TreasuryMetrics};

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence interface for per-treasury histories, metrics snapshots and scan progress.
pub trait TreasuryStore: Send + Sync {
    /// Append an entry to a treasury's history, preserving call order.
    fn append(&self, treasury: Address, entry: HistoryEntry) -> StoreResult<()>;

    /// Full ordered history for a treasury (empty if none).
    fn history(&self, treasury: &Address) -> StoreResult<Vec<HistoryEntry>>;

    /// Replace the metrics snapshot for a treasury.
    fn put_metrics(&self, metrics: TreasuryMetrics) -> StoreResult<()>;

    fn metrics(&self, treasury: &Address) -> StoreResult<Option<TreasuryMetrics>>;

    fn all_metrics(&self) -> StoreResult<Vec<TreasuryMetrics>>;

    fn last_processed_block(&self) -> StoreResult<Option<u64>>;

    fn set_last_processed_block(&self, block: u64) -> StoreResult<()>;
}

/// On-disk shape of an [`InMemoryStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    histories: HashMap<Address, Vec<HistoryEntry>>,
    metrics: HashMap<Address, TreasuryMetrics>,
    last_processed_block: Option<u64>,
}

/// DashMap-backed store with optional JSON snapshot persistence.
#[derive(Default)]
pub struct InMemoryStore {
    histories: DashMap<Address, Vec<HistoryEntry>>,
    metrics: DashMap<Address, TreasuryMetrics>,
    progress: Mutex<Option<u64>>,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryStore {
    /// Create an empty store that is never persisted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a snapshot file; a missing file yields an empty store
    /// bound to that path.
    pub fn load_from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let mut store = Self::new();
        store.snapshot_path = Some(path.to_path_buf());

        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let snapshot: StoreSnapshot = serde_json::from_reader(reader)?;

            for (k, v) in snapshot.histories {
                store.histories.insert(k, v);
            }
            for (k, v) in snapshot.metrics {
                store.metrics.insert(k, v);
            }
            store.progress = Mutex::new(snapshot.last_processed_block);

            tracing::info!(
                path = %path.display(),
                treasuries = store.histories.len(),
                last_processed_block = ?snapshot.last_processed_block,
                "Loaded store snapshot"
            );
        }
        Ok(store)
    }

    /// Write the snapshot file, if this store has a path.
    pub fn save_to_file(&self) -> StoreResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let snapshot = StoreSnapshot {
            histories: self
                .histories
                .iter()
                .map(|r| (*r.key(), r.value().clone()))
                .collect(),
            metrics: self
                .metrics
                .iter()
                .map(|r| (*r.key(), r.value().clone()))
                .collect(),
            last_processed_block: self.last_processed_block()?,
        };

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &snapshot)?;
        tracing::info!(
            path = %path.display(),
            treasuries = snapshot.histories.len(),
            "Saved store snapshot"
        );
        Ok(())
    }
}

impl TreasuryStore for InMemoryStore {
    fn append(&self, treasury: Address, entry: HistoryEntry) -> StoreResult<()> {
        self.histories.entry(treasury).or_default().push(entry);
        Ok(())
    }

    fn history(&self, treasury: &Address) -> StoreResult<Vec<HistoryEntry>> {
        Ok(self
            .histories
            .get(treasury)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }

    fn put_metrics(&self, metrics: TreasuryMetrics) -> StoreResult<()> {
        self.metrics.insert(metrics.address, metrics);
        Ok(())
    }

    fn metrics(&self, treasury: &Address) -> StoreResult<Option<TreasuryMetrics>> {
        Ok(self.metrics.get(treasury).map(|r| r.value().clone()))
    }

    fn all_metrics(&self) -> StoreResult<Vec<TreasuryMetrics>> {
        Ok(self.metrics.iter().map(|r| r.value().clone()).collect())
    }

    fn last_processed_block(&self) -> StoreResult<Option<u64>> {
        self.progress
            .lock()
            .map(|p| *p)
            .map_err(|_| StoreError::Poisoned)
    }

    fn set_last_processed_block(&self, block: u64) -> StoreResult<()> {
        let mut progress = self.progress.lock().map_err(|_| StoreError::Poisoned)?;
        *progress = Some(block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::SpendingCategory;
    use crate::treasury::types::{Runway, Transaction};
    use alloy::primitives::{Bytes, TxHash, U256};
    use std::collections::BTreeMap;

    fn entry(n: u8) -> HistoryEntry {
        HistoryEntry {
            transaction: Transaction {
                hash: TxHash::repeat_byte(n),
                from: Address::repeat_byte(0xaa),
                to: Some(Address::repeat_byte(0xbb)),
                value: U256::from(n),
                timestamp: 1_000 + n as u64,
                block_number: n as u64,
                input: Bytes::new(),
            },
            category: SpendingCategory::Operations,
        }
    }

    fn metrics_for(address: Address) -> TreasuryMetrics {
        TreasuryMetrics {
            address,
            total_assets: U256::ZERO,
            monthly_burn: 0.0,
            runway: Runway::Unbounded,
            top_recipients: Vec::new(),
            category_distribution: BTreeMap::new(),
            transaction_count: 0,
            total_outgoing: U256::ZERO,
            last_updated: 0,
        }
    }

    #[test]
    fn test_append_preserves_order() {
        let store = InMemoryStore::new();
        let treasury = Address::repeat_byte(0xaa);
        store.append(treasury, entry(1)).unwrap();
        store.append(treasury, entry(2)).unwrap();

        let history = store.history(&treasury).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].transaction.block_number, 1);
        assert!(store.history(&Address::ZERO).unwrap().is_empty());
    }

    #[test]
    fn test_progress() {
        let store = InMemoryStore::new();
        assert_eq!(store.last_processed_block().unwrap(), None);
        store.set_last_processed_block(99).unwrap();
        assert_eq!(store.last_processed_block().unwrap(), Some(99));
    }

    #[test]
    fn test_unbound_store_save_is_noop() {
        assert!(InMemoryStore::new().save_to_file().is_ok());
    }

    #[test]
    fn test_snapshot_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let treasury = Address::repeat_byte(0xaa);

        let store = InMemoryStore::load_from_file(&path).unwrap();
        store.append(treasury, entry(3)).unwrap();
        store.put_metrics(metrics_for(treasury)).unwrap();
        store.set_last_processed_block(1234).unwrap();
        store.save_to_file().unwrap();

        let loaded = InMemoryStore::load_from_file(&path).unwrap();
        assert_eq!(loaded.history(&treasury).unwrap(), vec![entry(3)]);
        assert!(loaded.metrics(&treasury).unwrap().is_some());
        assert_eq!(loaded.all_metrics().unwrap().len(), 1);
        assert_eq!(loaded.last_processed_block().unwrap(), Some(1234));
    }
}
