//! Balance lookup capability for runway estimates.
//!
//! The engine never fetches chain state itself. The scanner keeps a
//! [`BalanceCache`] fresh; tests and fixed setups use [`StaticBalances`].

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use std::collections::HashMap;

/// Source of current treasury balances.
pub trait BalanceSource: Send + Sync {
    /// Latest known balance in wei, `None` if never observed.
    fn balance(&self, treasury: &Address) -> Option<U256>;
}

/// Concurrent cache of balances, refreshed by the scanner.
#[derive(Debug, Default)]
pub struct BalanceCache {
    inner: DashMap<Address, U256>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, treasury: Address, balance: U256) {
        self.inner.insert(treasury, balance);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl BalanceSource for BalanceCache {
    fn balance(&self, treasury: &Address) -> Option<U256> {
        self.inner.get(treasury).map(|r| *r.value())
    }
}

/// Fixed balances.
#[derive(Debug, Default, Clone)]
pub struct StaticBalances(pub HashMap<Address, U256>);

impl StaticBalances {
    pub fn with(mut self, treasury: Address, balance: U256) -> Self {
        self.0.insert(treasury, balance);
        self
    }
}

impl BalanceSource for StaticBalances {
    fn balance(&self, treasury: &Address) -> Option<U256> {
        self.0.get(treasury).copied()
    }
}
