//! Classification rule store.
//!
//! Rules come from a TOML file holding an ordered `[[rules]]` array. Each
//! entry names a category and an optional `conditions` table:
//!
//! ```toml
//! [[rules]]
//! category = "OPERATIONS"
//! [rules.conditions]
//! value = { min = 0.01, max = 1 }    # whole tokens, inclusive
//! receiver_type = "EOA"              # or "CONTRACT"
//! note_contains = ["ops", "opex"]    # any substring, case-insensitive
//! to_address = ["0x…"]               # receiver allow-list
//! ```
//!
//! Parsing is strict: unknown keys, unknown categories, malformed addresses
//! and inverted ranges are errors. [`RuleSet::load`] never fails; it falls
//! back to [`RuleSet::default_rules`].

use alloy::primitives::Address;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::classification::category::{ParseCategoryError, SpendingCategory};
use crate::treasury::units::tokens_to_micro;

/// Errors found while reading or parsing a rule file.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("rule {index}: {source}")]
    UnknownCategory {
        index: usize,
        source: ParseCategoryError,
    },

    #[error("UNKNOWN is the fallback category and cannot have a rule")]
    FallbackRule,

    #[error("duplicate rule for {0}")]
    DuplicateCategory(SpendingCategory),

    #[error("{category}: invalid address '{value}'")]
    InvalidAddress {
        category: SpendingCategory,
        value: String,
    },

    #[error("{category}: invalid amount '{value}'")]
    InvalidAmount {
        category: SpendingCategory,
        value: String,
    },

    #[error("{0}: value range min exceeds max")]
    InvertedRange(SpendingCategory),

    #[error("rule file defines no rules")]
    Empty,
}

/// Receiver kind for `receiver_type` conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceiverKind {
    /// Externally-owned account.
    Eoa,
    Contract,
}

/// A single typed condition. A rule matches when all of its conditions hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Inclusive bounds in micro-tokens; `max: None` is unbounded.
    ValueRange { min: u128, max: Option<u128> },
    ReceiverType(ReceiverKind),
    /// Lower-cased needles; any one present in the memo satisfies it.
    NoteContains(Vec<String>),
    /// Receiver allow-list.
    ToAddress(Vec<Address>),
}

/// A category and the conditions that assign it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRule {
    pub category: SpendingCategory,
    pub conditions: Vec<Condition>,
}

impl ClassificationRule {
    pub fn new(category: SpendingCategory, conditions: Vec<Condition>) -> Self {
        Self {
            category,
            conditions,
        }
    }
}

/// Ordered, immutable rule list. Evaluation order is file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<ClassificationRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRuleFile {
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    category: String,
    #[serde(default)]
    conditions: RawConditions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConditions {
    value: Option<RawValueRange>,
    receiver_type: Option<ReceiverKind>,
    note_contains: Option<Vec<String>>,
    to_address: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawValueRange {
    min: Option<RawAmount>,
    max: Option<RawAmount>,
}

/// Amounts may be written as TOML numbers or decimal strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn to_micro(&self, category: SpendingCategory) -> Result<u128, RuleError> {
        let (tokens, text) = match self {
            RawAmount::Number(n) => (*n, n.to_string()),
            RawAmount::Text(s) => (s.trim().parse::<f64>().unwrap_or(f64::NAN), s.clone()),
        };
        if !tokens.is_finite() || tokens < 0.0 {
            return Err(RuleError::InvalidAmount {
                category,
                value: text,
            });
        }
        Ok(tokens_to_micro(tokens))
    }
}

impl RuleSet {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Load rules from a TOML file, substituting the defaults on any failure.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let result = std::fs::read_to_string(path)
            .map_err(RuleError::from)
            .and_then(|content| Self::from_toml_str(&content));

        match result {
            Ok(rules) => {
                tracing::info!(path = %path.display(), rules = rules.len(), "Loaded classification rules");
                rules
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Could not load classification rules, using defaults"
                );
                Self::default_rules()
            }
        }
    }

    /// Strictly parse a TOML rule document.
    pub fn from_toml_str(content: &str) -> Result<Self, RuleError> {
        let raw: RawRuleFile = toml::from_str(content)?;
        if raw.rules.is_empty() {
            return Err(RuleError::Empty);
        }

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(raw.rules.len());
        for (index, raw_rule) in raw.rules.into_iter().enumerate() {
            let category: SpendingCategory = raw_rule
                .category
                .parse()
                .map_err(|source| RuleError::UnknownCategory { index, source })?;
            if category == SpendingCategory::Unknown {
                return Err(RuleError::FallbackRule);
            }
            if !seen.insert(category) {
                return Err(RuleError::DuplicateCategory(category));
            }
            rules.push(ClassificationRule::new(
                category,
                parse_conditions(category, raw_rule.conditions)?,
            ));
        }
        Ok(Self { rules })
    }

    /// Built-in rules used when no rule file is available.
    pub fn default_rules() -> Self {
        use Condition::*;
        use SpendingCategory::*;

        let notes = |words: &[&str]| NoteContains(words.iter().map(|w| w.to_string()).collect());

        Self::new(vec![
            ClassificationRule::new(
                Grant,
                vec![
                    ValueRange { min: tokens_to_micro(0.1), max: None },
                    ReceiverType(ReceiverKind::Eoa),
                ],
            ),
            ClassificationRule::new(
                Salary,
                vec![
                    ValueRange { min: tokens_to_micro(0.5), max: None },
                    notes(&["salary", "payroll"]),
                ],
            ),
            ClassificationRule::new(Development, vec![notes(&["dev", "development", "code"])]),
            // Known DEX routers go here; with none listed the rule never matches.
            ClassificationRule::new(Liquidity, Vec::new()),
            ClassificationRule::new(Marketing, vec![notes(&["marketing", "promo", "ad"])]),
            ClassificationRule::new(
                Infrastructure,
                vec![notes(&["infra", "infrastructure", "hosting"])],
            ),
            ClassificationRule::new(
                Operations,
                vec![ValueRange {
                    min: tokens_to_micro(0.01),
                    max: Some(tokens_to_micro(1.0)),
                }],
            ),
        ])
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn parse_conditions(
    category: SpendingCategory,
    raw: RawConditions,
) -> Result<Vec<Condition>, RuleError> {
    let mut conditions = Vec::new();

    if let Some(range) = raw.value {
        let min = match &range.min {
            Some(amount) => amount.to_micro(category)?,
            None => 0,
        };
        let max = match &range.max {
            Some(amount) => Some(amount.to_micro(category)?),
            None => None,
        };
        if max.is_some_and(|max| min > max) {
            return Err(RuleError::InvertedRange(category));
        }
        conditions.push(Condition::ValueRange { min, max });
    }

    if let Some(kind) = raw.receiver_type {
        conditions.push(Condition::ReceiverType(kind));
    }

    // Empty lists constrain nothing and are dropped.
    if let Some(needles) = raw.note_contains {
        let needles: Vec<String> = needles
            .into_iter()
            .map(|n| n.to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        if !needles.is_empty() {
            conditions.push(Condition::NoteContains(needles));
        }
    }

    if let Some(addresses) = raw.to_address {
        let addresses = addresses
            .into_iter()
            .map(|a| {
                a.trim().parse::<Address>().map_err(|_| RuleError::InvalidAddress {
                    category,
                    value: a.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !addresses.is_empty() {
            conditions.push(Condition::ToAddress(addresses));
        }
    }

    Ok(conditions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_rules_cover_all_but_unknown() {
        let rules = RuleSet::default_rules();
        assert_eq!(rules.len(), 7);
        let categories: Vec<_> = rules.rules().iter().map(|r| r.category).collect();
        assert_eq!(&categories[..], &SpendingCategory::ALL[..7]);
    }

    #[test]
    fn test_shipped_rules_file_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/classification/rules.toml");
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(RuleSet::from_toml_str(&content).unwrap(), RuleSet::default_rules());
    }

    #[test]
    fn test_parse_preserves_order_and_types() {
        let rules = RuleSet::from_toml_str(
            r#"
            [[rules]]
            category = "operations"
            [rules.conditions]
            value = { min = "0.01", max = 1 }

            [[rules]]
            category = "LIQUIDITY"
            [rules.conditions]
            to_address = ["0x00000000000000000000000000000000000000AB"]
            receiver_type = "CONTRACT"
            "#,
        )
        .unwrap();

        assert_eq!(rules.rules()[0].category, SpendingCategory::Operations);
        assert_eq!(
            rules.rules()[0].conditions,
            vec![Condition::ValueRange { min: 10_000, max: Some(1_000_000) }]
        );
        assert_eq!(
            rules.rules()[1].conditions,
            vec![
                Condition::ReceiverType(ReceiverKind::Contract),
                Condition::ToAddress(vec![Address::with_last_byte(0xab)]),
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_condition_key() {
        let err = RuleSet::from_toml_str(
            r#"
            [[rules]]
            category = "GRANT"
            [rules.conditions]
            memo_regex = "x"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::Parse(_)));
    }

    #[test]
    fn test_rejects_bad_rules() {
        let unknown = "[[rules]]\ncategory = \"PAYROLL\"";
        assert!(matches!(
            RuleSet::from_toml_str(unknown),
            Err(RuleError::UnknownCategory { index: 0, .. })
        ));

        let fallback = "[[rules]]\ncategory = \"UNKNOWN\"";
        assert!(matches!(RuleSet::from_toml_str(fallback), Err(RuleError::FallbackRule)));

        let dup = "[[rules]]\ncategory = \"GRANT\"\n[[rules]]\ncategory = \"GRANT\"";
        assert!(matches!(
            RuleSet::from_toml_str(dup),
            Err(RuleError::DuplicateCategory(SpendingCategory::Grant))
        ));

        let inverted = "[[rules]]\ncategory = \"GRANT\"\nconditions = { value = { min = 2, max = 1 } }";
        let err = RuleSet::from_toml_str(inverted).unwrap_err();
        assert!(matches!(err, RuleError::InvertedRange(SpendingCategory::Grant)));
        assert_eq!(err.to_string(), "GRANT: value range min exceeds max");

        let bad_addr = "[[rules]]\ncategory = \"GRANT\"\nconditions = { to_address = [\"0x12\"] }";
        assert!(matches!(
            RuleSet::from_toml_str(bad_addr),
            Err(RuleError::InvalidAddress { .. })
        ));

        let bad_amount = "[[rules]]\ncategory = \"GRANT\"\nconditions = { value = { min = \"lots\" } }";
        assert!(matches!(
            RuleSet::from_toml_str(bad_amount),
            Err(RuleError::InvalidAmount { .. })
        ));

        assert!(matches!(RuleSet::from_toml_str(""), Err(RuleError::Empty)));
    }

    #[test]
    fn test_empty_lists_are_dropped() {
        let rules = RuleSet::from_toml_str(
            "[[rules]]\ncategory = \"LIQUIDITY\"\nconditions = { to_address = [], note_contains = [] }",
        )
        .unwrap();
        assert!(rules.rules()[0].conditions.is_empty());
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        assert_eq!(RuleSet::load("/no/such/rules.toml"), RuleSet::default_rules());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml [[").unwrap();
        assert_eq!(RuleSet::load(file.path()), RuleSet::default_rules());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[rules]]\ncategory = \"MARKETING\"\nconditions = {{ note_contains = [\"Promo\"] }}").unwrap();

        let rules = RuleSet::load(file.path());
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules.rules()[0].conditions,
            vec![Condition::NoteContains(vec!["promo".to_string()])]
        );
    }
}
