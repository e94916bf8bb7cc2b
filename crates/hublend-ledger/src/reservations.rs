//! Live reservation aggregates.
//!
//! Every ACTIVE lock holds back pool liquidity for its asset and, depending
//! on its kind, either future debt or withdrawable collateral for its user.
//! The lock manager owns the writes; the risk engine reads these totals on
//! every check so two outstanding locks can never spend the same headroom.
//!
//! Invariant: each aggregate equals the sum over ACTIVE locks.

use std::collections::HashMap;

use hublend_types::{Address, HubError, LockKind, Result, math};

/// Amounts held back by ACTIVE locks: pool liquidity per asset, debt and
/// withdraw capacity per `(user, asset)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reservations {
    liquidity: HashMap<Address, u128>,
    debt: HashMap<(Address, Address), u128>,
    withdraw: HashMap<(Address, Address), u128>,
}

impl Reservations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `amount` for a new lock.
    pub fn reserve(&mut self, kind: LockKind, user: Address, asset: Address, amount: u128) -> Result<()> {
        bump(&mut self.liquidity, asset, amount)?;
        match kind {
            LockKind::Borrow => bump(&mut self.debt, (user, asset), amount),
            LockKind::Withdraw => bump(&mut self.withdraw, (user, asset), amount),
        }
    }

    /// Release a lock's hold. Releasing more than is held is a bookkeeping
    /// fault, not a user error.
    pub fn release(&mut self, kind: LockKind, user: Address, asset: Address, amount: u128) -> Result<()> {
        drain(&mut self.liquidity, asset, amount)?;
        match kind {
            LockKind::Borrow => drain(&mut self.debt, (user, asset), amount),
            LockKind::Withdraw => drain(&mut self.withdraw, (user, asset), amount),
        }
    }

    /// Pool liquidity reserved in `asset` across all users.
    #[must_use]
    pub fn liquidity(&self, asset: Address) -> u128 {
        self.liquidity.get(&asset).copied().unwrap_or(0)
    }

    /// Debt reserved for `user` in `asset` by pending borrows.
    #[must_use]
    pub fn debt(&self, user: Address, asset: Address) -> u128 {
        self.debt.get(&(user, asset)).copied().unwrap_or(0)
    }

    /// Supply reserved for `user` in `asset` by pending withdrawals.
    #[must_use]
    pub fn withdraw(&self, user: Address, asset: Address) -> u128 {
        self.withdraw.get(&(user, asset)).copied().unwrap_or(0)
    }

    /// True when nothing is held anywhere.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.liquidity.is_empty() && self.debt.is_empty() && self.withdraw.is_empty()
    }
}

fn bump<K: std::hash::Hash + Eq>(map: &mut HashMap<K, u128>, key: K, amount: u128) -> Result<()> {
    let entry = map.entry(key).or_default();
    *entry = math::add(*entry, amount)?;
    Ok(())
}

fn drain<K: std::hash::Hash + Eq>(map: &mut HashMap<K, u128>, key: K, amount: u128) -> Result<()> {
    let held = map.get(&key).copied().unwrap_or(0);
    let Some(rest) = held.checked_sub(amount) else {
        return Err(HubError::ConservationViolation {
            reason: format!("release of {amount} exceeds reservation of {held}"),
        });
    };
    if rest == 0 {
        map.remove(&key);
    } else {
        map.insert(key, rest);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use hublend_types::test_address;

    use super::*;

    #[test]
    fn borrow_reservation_tracks_liquidity_and_debt() {
        let mut r = Reservations::new();
        let (user, usdc) = (test_address(1), test_address(2));
        r.reserve(LockKind::Borrow, user, usdc, 100).unwrap();
        r.reserve(LockKind::Withdraw, user, usdc, 30).unwrap();
        assert_eq!(r.liquidity(usdc), 130);
        assert_eq!(r.debt(user, usdc), 100);
        assert_eq!(r.withdraw(user, usdc), 30);

        r.release(LockKind::Borrow, user, usdc, 100).unwrap();
        r.release(LockKind::Withdraw, user, usdc, 30).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn over_release_is_a_conservation_fault() {
        let mut r = Reservations::new();
        let (user, usdc) = (test_address(1), test_address(2));
        r.reserve(LockKind::Borrow, user, usdc, 10).unwrap();
        let err = r.release(LockKind::Borrow, user, usdc, 11).unwrap_err();
        assert!(matches!(err, HubError::ConservationViolation { .. }));
    }
}
