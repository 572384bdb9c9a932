//! Block scanning subsystem.
//!
//! # Data Flow
//! ```text
//! ChainSource (RPC client or test double)
//!     → listener.rs (poll height, walk new blocks in order)
//!     → filter: sender or receiver in the watched set
//!     → Classifier → MetricsEngine → TreasuryStore
//!     → progress advanced per block, persisted in the store
//! ```
//!
//! # Design Decisions
//! - Single worker task; blocks are processed strictly in order
//! - Progress never moves backwards
//! - One transaction failing does not fail its block

pub mod listener;
pub mod state;

pub use listener::{BlockScanner, ScannerStatus};
pub use state::{ScannerError, ScannerState};
