//! Treasury transaction indexer.
//!
//! Watches a set of treasury addresses on Base, classifies each transaction
//! they send or receive into a spending category and maintains per-treasury
//! financial metrics (burn rate, runway, top recipients).

// Chain access
pub mod blockchain;
pub mod scanner;

// Domain
pub mod classification;
pub mod treasury;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use classification::{Classifier, RuleSet, SpendingCategory};
pub use config::schema::IndexerConfig;
pub use lifecycle::Shutdown;
pub use scanner::BlockScanner;
pub use treasury::{InMemoryStore, MetricsEngine, Transaction, TreasuryMetrics, TreasuryStore};
