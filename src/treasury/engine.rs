//! Metrics engine: per-treasury history and rolling financial metrics.
//!
//! Every update rebuilds the treasury's metrics from its full stored history.
//! No running totals survive between updates, so transactions ageing out of
//! the burn window can never leave stale amounts behind.

use alloy::primitives::{Address, U256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::classification::SpendingCategory;
use crate::config::MetricsConfig;
use crate::treasury::balance::BalanceSource;
use crate::treasury::store::{StoreResult, TreasuryStore};
use crate::treasury::types::{HistoryEntry, RecipientSummary, Runway, Transaction, TreasuryMetrics};
use crate::treasury::units::to_whole_tokens;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Tunables for metric derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSettings {
    /// Trailing burn window in seconds.
    pub window_secs: u64,
    /// Maximum number of top recipients.
    pub top_recipients: usize,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            window_secs: 30 * SECS_PER_DAY,
            top_recipients: 10,
        }
    }
}

impl From<&MetricsConfig> for MetricsSettings {
    fn from(config: &MetricsConfig) -> Self {
        Self {
            window_secs: config.window_days.saturating_mul(SECS_PER_DAY),
            top_recipients: config.top_recipients,
        }
    }
}

/// Owns treasury histories (through the store) and derives metrics from them.
pub struct MetricsEngine {
    store: Arc<dyn TreasuryStore>,
    balances: Arc<dyn BalanceSource>,
    settings: MetricsSettings,
}

impl MetricsEngine {
    pub fn new(
        store: Arc<dyn TreasuryStore>,
        balances: Arc<dyn BalanceSource>,
        settings: MetricsSettings,
    ) -> Self {
        Self {
            store,
            balances,
            settings,
        }
    }

    /// Append a classified transaction to its sender's history and recompute
    /// that treasury's metrics.
    pub fn record(
        &self,
        tx: &Transaction,
        category: SpendingCategory,
    ) -> StoreResult<TreasuryMetrics> {
        self.record_at(tx, category, unix_now())
    }

    /// [`record`](Self::record) with an explicit clock.
    pub fn record_at(
        &self,
        tx: &Transaction,
        category: SpendingCategory,
        now: u64,
    ) -> StoreResult<TreasuryMetrics> {
        // Only outgoing flow is attributed: the sender owns the entry.
        let treasury = tx.from;
        self.store.append(
            treasury,
            HistoryEntry {
                transaction: tx.clone(),
                category,
            },
        )?;
        self.recompute(treasury, now)
    }

    /// Recompute metrics for a treasury without appending, e.g. after its
    /// balance changed. `None` if the treasury has no history.
    pub fn refresh(&self, treasury: &Address) -> StoreResult<Option<TreasuryMetrics>> {
        self.refresh_at(treasury, unix_now())
    }

    pub fn refresh_at(&self, treasury: &Address, now: u64) -> StoreResult<Option<TreasuryMetrics>> {
        if self.store.metrics(treasury)?.is_none() {
            return Ok(None);
        }
        self.recompute(*treasury, now).map(Some)
    }

    pub fn get(&self, treasury: &Address) -> StoreResult<Option<TreasuryMetrics>> {
        self.store.metrics(treasury)
    }

    /// All snapshots, ordered by address.
    pub fn get_all(&self) -> StoreResult<Vec<TreasuryMetrics>> {
        let mut all = self.store.all_metrics()?;
        all.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(all)
    }

    pub fn settings(&self) -> MetricsSettings {
        self.settings
    }

    fn recompute(&self, treasury: Address, now: u64) -> StoreResult<TreasuryMetrics> {
        let history = self.store.history(&treasury)?;
        let balance = self.balances.balance(&treasury);
        let metrics = compute_metrics(treasury, &history, balance, &self.settings, now);

        tracing::debug!(
            treasury = %treasury,
            transactions = metrics.transaction_count,
            monthly_burn = metrics.monthly_burn,
            runway_months = ?metrics.runway.months(),
            "Treasury metrics updated"
        );

        self.store.put_metrics(metrics.clone())?;
        Ok(metrics)
    }
}

/// Derive a metrics snapshot from a treasury's full ordered history.
pub fn compute_metrics(
    treasury: Address,
    history: &[HistoryEntry],
    balance: Option<U256>,
    settings: &MetricsSettings,
    now: u64,
) -> TreasuryMetrics {
    let total_outgoing = history
        .iter()
        .fold(U256::ZERO, |acc, e| acc.saturating_add(e.transaction.value));

    let window_start = now.saturating_sub(settings.window_secs);
    let recent_outgoing = history
        .iter()
        .filter(|e| e.transaction.timestamp >= window_start)
        .fold(U256::ZERO, |acc, e| acc.saturating_add(e.transaction.value));
    let monthly_burn = to_whole_tokens(recent_outgoing);

    let total_assets = balance.unwrap_or(U256::ZERO);
    let runway = if recent_outgoing > U256::ZERO {
        Runway::Months(to_whole_tokens(total_assets) / monthly_burn)
    } else {
        Runway::Unbounded
    };

    let mut category_distribution: BTreeMap<SpendingCategory, u64> =
        SpendingCategory::ALL.iter().map(|c| (*c, 0)).collect();
    for entry in history {
        *category_distribution.entry(entry.category).or_insert(0) += 1;
    }

    TreasuryMetrics {
        address: treasury,
        total_assets,
        monthly_burn,
        runway,
        top_recipients: top_recipients(history, settings.top_recipients),
        category_distribution,
        transaction_count: history.len() as u64,
        total_outgoing,
        last_updated: now,
    }
}

/// Recipients ranked by cumulative value; ties keep first-seen order.
/// Contract creations have no recipient and are left out.
fn top_recipients(history: &[HistoryEntry], limit: usize) -> Vec<RecipientSummary> {
    let mut index: HashMap<Address, usize> = HashMap::new();
    let mut recipients: Vec<RecipientSummary> = Vec::new();

    for entry in history {
        let Some(to) = entry.transaction.to else {
            continue;
        };
        match index.get(&to) {
            Some(&i) => {
                let summary = &mut recipients[i];
                summary.amount = summary.amount.saturating_add(entry.transaction.value);
                summary.count += 1;
            }
            None => {
                index.insert(to, recipients.len());
                recipients.push(RecipientSummary {
                    address: to,
                    amount: entry.transaction.value,
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable, which keeps first-seen order among equal amounts
    recipients.sort_by(|a, b| b.amount.cmp(&a.amount));
    recipients.truncate(limit);
    recipients
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
