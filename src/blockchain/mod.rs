//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! ChainConfig (RPC URLs, timeouts, retry policy)
//!     → client.rs (alloy providers with failover, timeouts, backoff)
//!     → source.rs (ChainSource trait the scanner depends on)
//!     → types.rs (ChainBlock / ChainTransaction handed to the scanner)
//! ```
//!
//! # Constraints
//! - All RPC calls have configurable timeouts and a bounded retry count
//! - Exhausted retries surface as transient errors, never panics
//! - The data source is trusted; no header or receipt verification

pub mod client;
pub mod source;
pub mod types;

pub use client::BlockchainClient;
pub use source::ChainSource;
pub use types::{BlockchainError, BlockchainResult, ChainBlock, ChainId, ChainTransaction};
