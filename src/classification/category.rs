//! Spending categories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of spending categories. `Unknown` is the fallback.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpendingCategory {
    Grant,
    Salary,
    Development,
    Liquidity,
    Marketing,
    Infrastructure,
    Operations,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown spending category '{0}'")]
pub struct ParseCategoryError(pub String);

impl SpendingCategory {
    pub const ALL: [SpendingCategory; 8] = [
        SpendingCategory::Grant,
        SpendingCategory::Salary,
        SpendingCategory::Development,
        SpendingCategory::Liquidity,
        SpendingCategory::Marketing,
        SpendingCategory::Infrastructure,
        SpendingCategory::Operations,
        SpendingCategory::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpendingCategory::Grant => "GRANT",
            SpendingCategory::Salary => "SALARY",
            SpendingCategory::Development => "DEVELOPMENT",
            SpendingCategory::Liquidity => "LIQUIDITY",
            SpendingCategory::Marketing => "MARKETING",
            SpendingCategory::Infrastructure => "INFRASTRUCTURE",
            SpendingCategory::Operations => "OPERATIONS",
            SpendingCategory::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SpendingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpendingCategory {
    type Err = ParseCategoryError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == upper)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}
