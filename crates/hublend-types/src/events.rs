//! Events emitted by the hub for external collaborators.
//!
//! Events are buffered inside the transaction that produced them and only
//! published when that transaction commits, so a rejected operation never
//! leaks an event.

use serde::Serialize;

use crate::{Address, BatchId, DepositId, DepositKind, DomainId, IntentId, LockKind, U256};

/// A committed state delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HubEvent {
    AssetRegistered {
        asset: Address,
        symbol: String,
    },
    RiskParamsUpdated {
        asset: Address,
    },
    InterestAccrued {
        asset: Address,
        borrow_index: u128,
        supply_index: u128,
        reserves: u128,
        timestamp: u64,
    },
    Supplied {
        user: Address,
        asset: Address,
        amount: u128,
        shares: u128,
    },
    Withdrawn {
        user: Address,
        asset: Address,
        amount: u128,
        shares: u128,
    },
    Borrowed {
        user: Address,
        asset: Address,
        amount: u128,
        shares: u128,
    },
    Repaid {
        payer: Address,
        user: Address,
        asset: Address,
        amount: u128,
        shares: u128,
    },
    RepaySurplusRefunded {
        user: Address,
        asset: Address,
        amount: u128,
    },
    Liquidated {
        liquidator: Address,
        borrower: Address,
        debt_asset: Address,
        repaid: u128,
        collateral_asset: Address,
        seized: u128,
    },
    LockCreated {
        intent_id: IntentId,
        kind: LockKind,
        user: Address,
        asset: Address,
        amount: u128,
        relayer: Address,
        expiry: u64,
        reserved_liquidity: u128,
    },
    LockCancelled {
        intent_id: IntentId,
        reserved_liquidity: u128,
    },
    LockConsumed {
        intent_id: IntentId,
        reserved_liquidity: u128,
    },
    FillRecorded {
        intent_id: IntentId,
        relayer: Address,
        amount: u128,
        fee: u128,
        verified: bool,
    },
    DepositRegistered {
        origin_domain_id: DomainId,
        deposit_id: DepositId,
        kind: DepositKind,
        user: Address,
        asset: Address,
        amount: u128,
    },
    DepositConsumed {
        origin_domain_id: DomainId,
        deposit_id: DepositId,
    },
    SupplyCredited {
        user: Address,
        asset: Address,
        amount: u128,
        shares: u128,
    },
    RepayCredited {
        user: Address,
        asset: Address,
        amount: u128,
        shares: u128,
    },
    BorrowFinalized {
        intent_id: IntentId,
        user: Address,
        asset: Address,
        amount: u128,
        relayer: Address,
    },
    WithdrawFinalized {
        intent_id: IntentId,
        user: Address,
        asset: Address,
        amount: u128,
        relayer: Address,
    },
    BatchSettled {
        batch_id: BatchId,
        actions_root: U256,
        action_count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_tag() {
        let ev = HubEvent::BatchSettled {
            batch_id: BatchId::from_u64(1),
            actions_root: U256::from(5u64),
            action_count: 2,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "batch_settled");
        assert_eq!(json["action_count"], 2);
    }
}
