//! Batch content commitment (`actions_root`) and proof public inputs.
//!
//! All arithmetic happens in the prime field `p` used by the proof system:
//!
//! ```text
//! hash_pair(l, r) = ((l + r·β + C) mod p)^5 mod p
//!
//! root = hash_pair(batch_id, hub)
//!      → hash_pair(·, counterparty)
//!      → hash_pair(·, action_count)
//!      → hash_pair(·, action_hash_i)     for every action, in apply order
//!      → hash_pair(·, 0)                 until 50 slots are filled
//! ```
//!
//! An action hash folds `hash_pair` from the kind tag over each field in
//! declaration order. Addresses and 32-byte ids enter as big-endian integers.
//! The root is a pure function of batch content: any field change, reorder,
//! insertion or removal changes it.

use alloy_primitives::U256;
use hublend_types::{
    CreditAction, FinalizeAction, HubError, IntentKind, Result, SettlementBatch, address_word,
    constants::{FIELD_PRIME, HASH_BETA, HASH_CONSTANT, MAX_BATCH_ACTIONS, PUBLIC_INPUT_COUNT},
};

/// The commitment's two-to-one compression.
#[must_use]
pub fn hash_pair(left: U256, right: U256) -> U256 {
    let left = left.reduce_mod(FIELD_PRIME);
    let right = right.reduce_mod(FIELD_PRIME);
    let inner = left
        .add_mod(right.mul_mod(HASH_BETA, FIELD_PRIME), FIELD_PRIME)
        .add_mod(HASH_CONSTANT, FIELD_PRIME);
    inner.pow_mod(U256::from(5u8), FIELD_PRIME)
}

fn fold(seed: U256, fields: impl IntoIterator<Item = U256>) -> U256 {
    fields.into_iter().fold(seed, hash_pair)
}

/// Hash of a supply or repay credit.
#[must_use]
pub fn credit_hash(kind: IntentKind, action: &CreditAction) -> U256 {
    fold(
        U256::from(kind.tag()),
        [
            action.origin_domain_id.word(),
            action.deposit_id.0,
            address_word(action.user),
            address_word(action.asset),
            U256::from(action.amount),
        ],
    )
}

/// Hash of a borrow or withdraw finalization.
#[must_use]
pub fn finalize_hash(kind: IntentKind, action: &FinalizeAction) -> U256 {
    fold(
        U256::from(kind.tag()),
        [
            action.intent_id.word(),
            address_word(action.user),
            address_word(action.asset),
            U256::from(action.amount),
            U256::from(action.fee),
            address_word(action.relayer),
        ],
    )
}

/// Recompute the commitment over a batch's content.
///
/// # Errors
/// Returns `BatchTooLarge` when the batch holds more than 50 actions.
pub fn actions_root(batch: &SettlementBatch) -> Result<U256> {
    let count = batch.action_count();
    if count > MAX_BATCH_ACTIONS {
        return Err(HubError::BatchTooLarge {
            count,
            max: MAX_BATCH_ACTIONS,
        });
    }

    let action_hashes = batch
        .supply_credits
        .iter()
        .map(|a| credit_hash(IntentKind::Supply, a))
        .chain(
            batch
                .repay_credits
                .iter()
                .map(|a| credit_hash(IntentKind::Repay, a)),
        )
        .chain(
            batch
                .borrow_finalizations
                .iter()
                .map(|a| finalize_hash(IntentKind::Borrow, a)),
        )
        .chain(
            batch
                .withdraw_finalizations
                .iter()
                .map(|a| finalize_hash(IntentKind::Withdraw, a)),
        );
    let padding = std::iter::repeat_n(U256::ZERO, MAX_BATCH_ACTIONS - count);

    let header = hash_pair(batch.batch_id.0, batch.hub_domain_id.word());
    let root = fold(
        header,
        [batch.counterparty_domain_id.word(), U256::from(count)],
    );
    Ok(fold(root, action_hashes.chain(padding)))
}

/// The proof's public inputs: `[batch_id, hub, counterparty, root] mod p`.
#[must_use]
pub fn public_inputs(batch: &SettlementBatch) -> [U256; PUBLIC_INPUT_COUNT] {
    [
        batch.batch_id.0.reduce_mod(FIELD_PRIME),
        batch.hub_domain_id.word().reduce_mod(FIELD_PRIME),
        batch.counterparty_domain_id.word().reduce_mod(FIELD_PRIME),
        batch.actions_root.reduce_mod(FIELD_PRIME),
    ]
}

/// Fill in `batch.actions_root` from its content. Used by batch builders.
pub fn seal(batch: &mut SettlementBatch) -> Result<()> {
    batch.actions_root = actions_root(batch)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use hublend_types::{BatchId, DepositId, DomainId, IntentId, B256, test_address};

    use super::*;

    fn credit(n: u64, amount: u128) -> CreditAction {
        CreditAction {
            origin_domain_id: DomainId(10),
            deposit_id: DepositId::from_u64(n),
            user: test_address(1),
            asset: test_address(2),
            amount,
        }
    }

    fn finalize(amount: u128) -> FinalizeAction {
        FinalizeAction {
            intent_id: IntentId(B256::repeat_byte(0xab)),
            user: test_address(1),
            asset: test_address(2),
            amount,
            fee: 1,
            relayer: test_address(3),
        }
    }

    fn batch() -> SettlementBatch {
        let mut b = SettlementBatch::new(BatchId::from_u64(7), DomainId(1), DomainId(10));
        b.supply_credits.push(credit(1, 100));
        b.borrow_finalizations.push(finalize(50));
        b
    }

    #[test]
    fn hash_pair_matches_definition() {
        // ((1 + 2·β + C) mod p)^5 mod p, computed independently.
        let inner = U256::from(1u8) + U256::from(2u8) * HASH_BETA + HASH_CONSTANT;
        let expected = inner.pow_mod(U256::from(5u8), FIELD_PRIME);
        assert_eq!(hash_pair(U256::from(1u8), U256::from(2u8)), expected);
        assert!(hash_pair(U256::MAX, U256::MAX) < FIELD_PRIME);
    }

    #[test]
    fn root_is_deterministic() {
        assert_eq!(actions_root(&batch()).unwrap(), actions_root(&batch()).unwrap());
    }

    #[test]
    fn root_binds_every_field() {
        let base = actions_root(&batch()).unwrap();

        let mut b = batch();
        b.borrow_finalizations[0].amount += 1;
        assert_ne!(actions_root(&b).unwrap(), base);

        let mut b = batch();
        b.borrow_finalizations[0].fee = 2;
        assert_ne!(actions_root(&b).unwrap(), base);

        let mut b = batch();
        b.counterparty_domain_id = DomainId(11);
        assert_ne!(actions_root(&b).unwrap(), base);

        let mut b = batch();
        b.batch_id = BatchId::from_u64(8);
        assert_ne!(actions_root(&b).unwrap(), base);
    }

    #[test]
    fn root_binds_order_and_grouping() {
        let mut a = SettlementBatch::new(BatchId::from_u64(1), DomainId(1), DomainId(10));
        a.supply_credits = vec![credit(1, 5), credit(2, 5)];
        let mut b = a.clone();
        b.supply_credits.reverse();
        assert_ne!(actions_root(&a).unwrap(), actions_root(&b).unwrap());

        // Same credit filed as a repay hashes under a different tag.
        let mut c = a.clone();
        c.repay_credits = c.supply_credits.split_off(1);
        assert_ne!(actions_root(&a).unwrap(), actions_root(&c).unwrap());
    }

    #[test]
    fn empty_batch_has_a_root() {
        let b = SettlementBatch::new(BatchId::from_u64(1), DomainId(1), DomainId(10));
        let root = actions_root(&b).unwrap();
        assert!(root < FIELD_PRIME);
    }

    #[test]
    fn oversized_batch_rejected() {
        let mut b = SettlementBatch::new(BatchId::from_u64(1), DomainId(1), DomainId(10));
        b.supply_credits = (0..51).map(|n| credit(n, 1)).collect();
        assert_eq!(
            actions_root(&b),
            Err(HubError::BatchTooLarge { count: 51, max: 50 })
        );
        b.supply_credits.pop();
        assert!(actions_root(&b).is_ok());
    }

    #[test]
    fn public_inputs_reduce_mod_p() {
        let mut b = batch();
        b.batch_id = BatchId(FIELD_PRIME + U256::from(3u8));
        seal(&mut b).unwrap();
        let inputs = public_inputs(&b);
        assert_eq!(inputs[0], U256::from(3u8));
        assert_eq!(inputs[1], U256::from(1u8));
        assert_eq!(inputs[2], U256::from(10u8));
        assert_eq!(inputs[3], b.actions_root);
    }
}
