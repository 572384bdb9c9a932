//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! scanner / engine / client produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (tx hash, block number, treasury) on every event
//! - Metrics are cheap no-ops when no exporter is installed

pub mod logging;
pub mod metrics;
