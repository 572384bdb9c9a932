//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! RPC call from blockchain::client:
//!     → tokio::time::timeout (per-call deadline)
//!     → on failure: next failover provider
//!     → all providers failed: backoff.rs delay, retry the round
//!     → retries exhausted: transient error to the scanner
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retry count is bounded; exhaustion is never fatal
//! - Jittered backoff prevents synchronized retries

pub mod backoff;
