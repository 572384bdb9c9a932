//! Transaction classifier.
//!
//! Pure function of (transaction, rule set): no I/O, no chain reads. Receiver
//! type and memo are inferred from the transaction itself:
//! - memo: the call-data when it is printable UTF-8 text (trailing NULs trimmed)
//! - receiver: contract creation or non-text call-data means CONTRACT,
//!   a plain or memo-carrying transfer means EOA

use alloy::primitives::U256;

use crate::classification::category::SpendingCategory;
use crate::classification::rules::{ClassificationRule, Condition, ReceiverKind, RuleSet};
use crate::treasury::types::Transaction;
use crate::treasury::units::to_micro_tokens;

/// Assigns exactly one category to each transaction.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: RuleSet,
}

/// Per-transaction values derived once and shared by every rule check.
struct TxFacts<'a> {
    tx: &'a Transaction,
    value_micro: U256,
    memo: Option<String>,
    receiver: ReceiverKind,
}

impl<'a> TxFacts<'a> {
    fn of(tx: &'a Transaction) -> Self {
        let memo = extract_memo(&tx.input);
        let receiver = if tx.is_contract_creation() {
            ReceiverKind::Contract
        } else if tx.input.is_empty() || memo.is_some() {
            ReceiverKind::Eoa
        } else {
            ReceiverKind::Contract
        };
        Self {
            tx,
            value_micro: to_micro_tokens(tx.value),
            memo,
            receiver,
        }
    }
}

impl Classifier {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// First matching rule's category in rule order, else `Unknown`.
    pub fn classify(&self, tx: &Transaction) -> SpendingCategory {
        let facts = TxFacts::of(tx);
        self.rules
            .rules()
            .iter()
            .find(|rule| matches_rule(rule, &facts))
            .map(|rule| rule.category)
            .unwrap_or_default()
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }
}

fn matches_rule(rule: &ClassificationRule, facts: &TxFacts<'_>) -> bool {
    !rule.conditions.is_empty() && rule.conditions.iter().all(|c| holds(c, facts))
}

fn holds(condition: &Condition, facts: &TxFacts<'_>) -> bool {
    match condition {
        Condition::ValueRange { min, max } => {
            facts.value_micro >= U256::from(*min)
                && max.map_or(true, |max| facts.value_micro <= U256::from(max))
        }
        Condition::ReceiverType(kind) => facts.receiver == *kind,
        Condition::NoteContains(needles) => facts
            .memo
            .as_deref()
            .is_some_and(|memo| needles.iter().any(|n| memo.contains(n.as_str()))),
        Condition::ToAddress(allowed) => facts.tx.to.is_some_and(|to| allowed.contains(&to)),
    }
}

/// Lower-cased text memo carried in call-data, if any.
fn extract_memo(input: &[u8]) -> Option<String> {
    let end = input.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    let text = std::str::from_utf8(&input[..end]).ok()?;
    if text.trim().is_empty() || text.chars().any(|c| c.is_control() && !c.is_whitespace()) {
        return None;
    }
    Some(text.to_lowercase())
}
