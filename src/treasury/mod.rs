//! Treasury subsystem.
//!
//! # Data Flow
//! ```text
//! (Transaction, SpendingCategory) from the scanner
//!     → engine.rs (attribute to sender, append, recompute)
//!     → store.rs (history + metrics snapshot + scan progress)
//!     → balance.rs (current balance for runway)
//!
//! Query surface:
//!     engine.get / engine.get_all → TreasuryMetrics
//! ```
//!
//! # Design Decisions
//! - Metrics are rebuilt wholesale from history on every update
//! - Storage and balance lookup are injected, keeping the engine pure
//! - Values stay in wei (`U256`) until reported in whole tokens

pub mod balance;
pub mod engine;
pub mod store;
pub mod types;
pub mod units;

pub use balance::{BalanceCache, BalanceSource, StaticBalances};
pub use engine::{compute_metrics, MetricsEngine, MetricsSettings};
pub use store::{InMemoryStore, StoreError, StoreResult, TreasuryStore};
pub use types::{HistoryEntry, RecipientSummary, Runway, Transaction, TreasuryMetrics};
