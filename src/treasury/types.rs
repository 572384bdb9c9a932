//! Treasury data model: observed transactions, history entries and metrics snapshots.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::blockchain::types::{ChainBlock, ChainTransaction};
use crate::classification::SpendingCategory;

/// One on-chain transaction touching a watched treasury. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: TxHash,
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    /// Value in wei.
    pub value: U256,
    /// Block timestamp, seconds since epoch.
    pub timestamp: u64,
    pub block_number: u64,
    /// Raw call-data payload.
    pub input: Bytes,
}

impl Transaction {
    /// Build from a fetched block and one of its transactions.
    pub fn from_chain(block: &ChainBlock, tx: &ChainTransaction) -> Self {
        Self {
            hash: tx.hash,
            from: tx.from,
            to: tx.to,
            value: tx.value,
            timestamp: block.timestamp,
            block_number: block.number,
            input: tx.input.clone(),
        }
    }

    /// Whether this is a contract-creation transaction.
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}

/// A transaction paired with the category it was assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub transaction: Transaction,
    pub category: SpendingCategory,
}

/// Months of balance left at the current burn rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Runway {
    Months(f64),
    /// Nothing was spent in the window.
    Unbounded,
}

impl Runway {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Runway::Unbounded)
    }

    /// Finite months, or `None` when unbounded.
    pub fn months(&self) -> Option<f64> {
        match self {
            Runway::Months(m) => Some(*m),
            Runway::Unbounded => None,
        }
    }
}

/// Cumulative outflow to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientSummary {
    pub address: Address,
    /// Sum of value in wei.
    pub amount: U256,
    pub count: u64,
}

/// Derived metrics for one treasury, rebuilt from its full history on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasuryMetrics {
    pub address: Address,
    /// Current balance in wei, from the balance source (zero when unknown).
    pub total_assets: U256,
    /// Outgoing value over the trailing window, in whole tokens.
    pub monthly_burn: f64,
    pub runway: Runway,
    pub top_recipients: Vec<RecipientSummary>,
    /// Transaction count per category; every category is present.
    pub category_distribution: BTreeMap<SpendingCategory, u64>,
    pub transaction_count: u64,
    /// Sum of all outgoing value ever observed, in wei.
    pub total_outgoing: U256,
    /// Seconds since epoch.
    pub last_updated: u64,
}

impl TreasuryMetrics {
    /// Category with the most transactions; first in declaration order on ties.
    pub fn top_category(&self) -> SpendingCategory {
        let mut best = SpendingCategory::Unknown;
        let mut best_count = 0;
        for (category, count) in &self.category_distribution {
            if *count > best_count {
                best = *category;
                best_count = *count;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runway_accessors() {
        assert!(Runway::Unbounded.is_unbounded());
        assert_eq!(Runway::Unbounded.months(), None);
        assert_eq!(Runway::Months(2.5).months(), Some(2.5));
    }

    #[test]
    fn test_runway_serde() {
        let json = serde_json::to_string(&Runway::Unbounded).unwrap();
        assert_eq!(json, "\"unbounded\"");
        let json = serde_json::to_string(&Runway::Months(3.0)).unwrap();
        assert_eq!(json, "{\"months\":3.0}");
    }

    #[test]
    fn test_from_chain_copies_block_context() {
        let block = ChainBlock {
            number: 42,
            timestamp: 1_700_000_000,
            transactions: Vec::new(),
        };
        let chain_tx = ChainTransaction {
            hash: TxHash::repeat_byte(1),
            from: Address::repeat_byte(0xaa),
            to: None,
            value: U256::from(7u64),
            input: Bytes::new(),
        };
        let tx = Transaction::from_chain(&block, &chain_tx);
        assert_eq!(tx.block_number, 42);
        assert_eq!(tx.timestamp, 1_700_000_000);
        assert!(tx.is_contract_creation());
    }
}
