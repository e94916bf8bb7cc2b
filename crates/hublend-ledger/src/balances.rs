//! Hub token wallets.
//!
//! Tracks per-(owner, asset) token holdings on the hub domain: what relayers
//! receive on finalization, what liquidators pay from, and where repay
//! surpluses land. Pool liquidity is tracked separately as `Market::cash`.
//! All mutations are atomic: either the full operation succeeds or the
//! balance is unchanged.

use std::collections::HashMap;

use hublend_types::{Address, HubError, Result, math};

/// Hub-side token balances.
#[derive(Debug, Clone, Default)]
pub struct TokenBalances {
    balances: HashMap<(Address, Address), u128>,
}

impl TokenBalances {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `asset` to `owner`.
    pub fn credit(&mut self, owner: Address, asset: Address, amount: u128) -> Result<()> {
        let entry = self.balances.entry((owner, asset)).or_default();
        *entry = math::add(*entry, amount)?;
        Ok(())
    }

    /// Debit `amount` of `asset` from `owner`.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if the wallet holds less than `amount`.
    pub fn debit(&mut self, owner: Address, asset: Address, amount: u128) -> Result<()> {
        let available = self.balance(owner, asset);
        if available < amount {
            return Err(HubError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(&(owner, asset));
        } else {
            self.balances.insert((owner, asset), remaining);
        }
        Ok(())
    }

    /// Balance of `asset` held by `owner`; zero when none.
    #[must_use]
    pub fn balance(&self, owner: Address, asset: Address) -> u128 {
        self.balances.get(&(owner, asset)).copied().unwrap_or(0)
    }

    /// Sum of every wallet holding `asset`.
    #[must_use]
    pub fn total(&self, asset: Address) -> u128 {
        self.balances
            .iter()
            .filter(|((_, a), _)| *a == asset)
            .fold(0u128, |acc, (_, amount)| acc.saturating_add(*amount))
    }
}
