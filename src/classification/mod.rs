//! Spending classification subsystem.
//!
//! # Data Flow
//! ```text
//! rules.toml (or built-in defaults)
//!     → rules.rs (strict parse into typed conditions, once at startup)
//!     → classifier.rs (first matching rule wins, else UNKNOWN)
//!     → SpendingCategory handed to the metrics engine
//! ```

pub mod category;
pub mod classifier;
pub mod rules;

pub use category::SpendingCategory;
pub use classifier::Classifier;
pub use rules::{ClassificationRule, Condition, ReceiverKind, RuleError, RuleSet};
