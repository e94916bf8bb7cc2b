//! Settlement batch model.
//!
//! A `SettlementBatch` is constructed off-core, submitted once together with
//! a proof, and either fully applied or fully rejected. Actions are grouped
//! by kind and applied in a fixed order: supply credits, repay credits,
//! borrow finalizations, withdraw finalizations.

use serde::{Deserialize, Serialize};

use crate::{
    Address, BatchId, DepositId, DepositKind, DepositTerms, DomainId, IntentId, LockKind,
    LockTerms, U256,
};

/// Credit of an inbound custody deposit (supply or repay).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAction {
    pub origin_domain_id: DomainId,
    pub deposit_id: DepositId,
    pub user: Address,
    pub asset: Address,
    pub amount: u128,
}

impl CreditAction {
    /// The custody terms this credit must match.
    #[must_use]
    pub fn terms(&self, kind: DepositKind) -> DepositTerms {
        DepositTerms {
            kind,
            user: self.user,
            asset: self.asset,
            amount: self.amount,
        }
    }
}

/// Finalization of a locked, fulfilled intent (borrow or withdraw).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeAction {
    pub intent_id: IntentId,
    pub user: Address,
    pub asset: Address,
    pub amount: u128,
    pub fee: u128,
    pub relayer: Address,
}

impl FinalizeAction {
    /// The lock terms this finalization must match.
    #[must_use]
    pub fn terms(&self, kind: LockKind) -> LockTerms {
        LockTerms {
            kind,
            user: self.user,
            asset: self.asset,
            amount: self.amount,
            relayer: self.relayer,
        }
    }
}

/// A bounded set of pending actions committed under one proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementBatch {
    pub batch_id: BatchId,
    pub hub_domain_id: DomainId,
    pub counterparty_domain_id: DomainId,
    /// Content commitment over every field below.
    pub actions_root: U256,
    #[serde(default)]
    pub supply_credits: Vec<CreditAction>,
    #[serde(default)]
    pub repay_credits: Vec<CreditAction>,
    #[serde(default)]
    pub borrow_finalizations: Vec<FinalizeAction>,
    #[serde(default)]
    pub withdraw_finalizations: Vec<FinalizeAction>,
}

impl SettlementBatch {
    /// An empty batch; `actions_root` must be filled in before submission.
    #[must_use]
    pub fn new(batch_id: BatchId, hub_domain_id: DomainId, counterparty_domain_id: DomainId) -> Self {
        Self {
            batch_id,
            hub_domain_id,
            counterparty_domain_id,
            actions_root: U256::ZERO,
            supply_credits: Vec::new(),
            repay_credits: Vec::new(),
            borrow_finalizations: Vec::new(),
            withdraw_finalizations: Vec::new(),
        }
    }

    /// Total number of actions across all four groups.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.supply_credits.len()
            + self.repay_credits.len()
            + self.borrow_finalizations.len()
            + self.withdraw_finalizations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{B256, test_address};

    #[test]
    fn action_count_sums_groups() {
        let mut batch = SettlementBatch::new(BatchId::from_u64(1), DomainId(1), DomainId(10));
        assert_eq!(batch.action_count(), 0);
        let credit = CreditAction {
            origin_domain_id: DomainId(10),
            deposit_id: DepositId::from_u64(1),
            user: test_address(1),
            asset: test_address(2),
            amount: 10,
        };
        batch.supply_credits.push(credit);
        batch.repay_credits.push(credit);
        batch.borrow_finalizations.push(FinalizeAction {
            intent_id: IntentId(B256::ZERO),
            user: test_address(1),
            asset: test_address(2),
            amount: 10,
            fee: 0,
            relayer: test_address(3),
        });
        assert_eq!(batch.action_count(), 3);
    }

    #[test]
    fn finalize_terms_carry_kind() {
        let action = FinalizeAction {
            intent_id: IntentId(B256::ZERO),
            user: test_address(1),
            asset: test_address(2),
            amount: 10,
            fee: 1,
            relayer: test_address(3),
        };
        assert_eq!(action.terms(LockKind::Withdraw).kind, LockKind::Withdraw);
        assert_eq!(action.terms(LockKind::Borrow).relayer, test_address(3));
    }
}
