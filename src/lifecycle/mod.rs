//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → scanner.stop() → current cycle finishes → snapshot saved → exit
//! ```
//!
//! # Design Decisions
//! - The scanner is never aborted mid-block; stop waits for the cycle
//! - A second signal while draining exits immediately

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{spawn_signal_handler, wait_for_signal};
