//! Settlement engine: applies a proven batch to hub state.
//!
//! ```text
//!   batch ──► replay / domain checks ──► actions_root ──► proof
//!         ──► mark batch ──► supply credits ──► repay credits
//!         ──► borrow finalizations ──► withdraw finalizations ──► BatchSettled
//! ```
//!
//! The engine mutates the state it is handed in place and stops at the first
//! failing action. Atomicity comes from the caller: [`crate::Hub`] runs every
//! batch against a working copy and discards it on error.

use hublend_ledger::{PriceOracle, SettlementCap};
use hublend_types::{
    BatchId, CreditAction, DepositKind, EngineConfig, FinalizeAction, HubError, HubEvent,
    LockKind, Result, SettlementBatch, U256,
};
use serde::Serialize;

use crate::{
    commitment,
    context::Context,
    state::HubState,
    verifier::{ProofVerifier, SettlementProof},
};

/// Summary of an applied batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementReceipt {
    pub batch_id: BatchId,
    pub actions_root: U256,
    pub action_count: usize,
    /// Repay surplus returned to users' hub wallets, summed over the batch.
    pub refunded: u128,
    pub settled_at: u64,
}

/// Applies one batch at a time using the hub's capability, config, proof
/// verifier and oracle.
pub struct SettlementEngine<'a> {
    cap: &'a SettlementCap,
    config: &'a EngineConfig,
    verifier: &'a dyn ProofVerifier,
    oracle: &'a dyn PriceOracle,
}

impl<'a> SettlementEngine<'a> {
    #[must_use]
    pub fn new(
        cap: &'a SettlementCap,
        config: &'a EngineConfig,
        verifier: &'a dyn ProofVerifier,
        oracle: &'a dyn PriceOracle,
    ) -> Self {
        Self {
            cap,
            config,
            verifier,
            oracle,
        }
    }

    /// Validate `batch` against `proof` and apply every action to `state`.
    pub fn settle_batch(
        &self,
        state: &mut HubState,
        batch: &SettlementBatch,
        proof: &SettlementProof,
        now: u64,
    ) -> Result<SettlementReceipt> {
        self.validate(state, batch, proof)?;
        state.guards.mark_batch(batch.batch_id)?;
        state.ledger.accrue_all(&state.registry, now)?;

        let mut refunded = 0u128;
        for credit in &batch.supply_credits {
            self.apply_credit(state, DepositKind::Supply, credit, now)?;
        }
        for credit in &batch.repay_credits {
            refunded = refunded.saturating_add(self.apply_credit(state, DepositKind::Repay, credit, now)?);
        }
        for action in &batch.borrow_finalizations {
            self.apply_finalization(state, LockKind::Borrow, action, now)?;
        }
        for action in &batch.withdraw_finalizations {
            self.apply_finalization(state, LockKind::Withdraw, action, now)?;
        }

        let action_count = batch.action_count();
        tracing::info!(
            batch = %batch.batch_id,
            counterparty = %batch.counterparty_domain_id,
            actions = action_count,
            refunded,
            "batch settled"
        );
        state.ledger.emit(HubEvent::BatchSettled {
            batch_id: batch.batch_id,
            actions_root: batch.actions_root,
            action_count,
        });
        Ok(SettlementReceipt {
            batch_id: batch.batch_id,
            actions_root: batch.actions_root,
            action_count,
            refunded,
            settled_at: now,
        })
    }

    /// Steps that read but never write: replay, domains, size, root, proof.
    fn validate(&self, state: &HubState, batch: &SettlementBatch, proof: &SettlementProof) -> Result<()> {
        if state.guards.is_batch_executed(batch.batch_id) {
            return Err(HubError::BatchAlreadyExecuted(batch.batch_id));
        }
        if batch.hub_domain_id != self.config.hub_domain_id {
            return Err(HubError::WrongHubDomain {
                expected: self.config.hub_domain_id,
                actual: batch.hub_domain_id,
            });
        }
        if !self.config.is_counterparty(batch.counterparty_domain_id) {
            return Err(HubError::UnknownDomain(batch.counterparty_domain_id));
        }

        let root = commitment::actions_root(batch)?;
        if root != batch.actions_root {
            return Err(HubError::ActionsRootMismatch {
                expected: root,
                actual: batch.actions_root,
            });
        }
        let inputs = commitment::public_inputs(batch);
        if !self.verifier.verify(proof, &inputs) {
            tracing::warn!(batch = %batch.batch_id, system = proof.system(), "proof rejected");
            return Err(HubError::InvalidProof);
        }
        Ok(())
    }

    /// Deposit guard, custody release, ledger credit. Returns the refunded
    /// surplus for repay credits.
    fn apply_credit(
        &self,
        state: &mut HubState,
        kind: DepositKind,
        credit: &CreditAction,
        now: u64,
    ) -> Result<u128> {
        let key = (credit.origin_domain_id, credit.deposit_id);
        state.guards.mark_deposit(key)?;
        let terms = state
            .custody
            .consume_to_ledger(self.cap, &mut state.ledger, key, &credit.terms(kind))?;

        let registry = &state.registry;
        match kind {
            DepositKind::Supply => {
                state
                    .ledger
                    .credit_supply(self.cap, registry, terms.user, terms.asset, terms.amount, now)?;
                Ok(0)
            }
            DepositKind::Repay => {
                let outcome = state
                    .ledger
                    .credit_repay(self.cap, registry, terms.user, terms.asset, terms.amount, now)?;
                Ok(outcome.surplus)
            }
        }
    }

    /// Intent guard, evidence, lock consumption, fresh risk check, ledger
    /// finalization.
    fn apply_finalization(
        &self,
        state: &mut HubState,
        kind: LockKind,
        action: &FinalizeAction,
        now: u64,
    ) -> Result<()> {
        let intent_id = action.intent_id;
        let terms = action.terms(kind);
        state.guards.mark_intent(intent_id)?;
        state.evidence.consume(intent_id, &terms, action.fee)?;
        state
            .locks
            .consume_lock(self.cap, &mut state.ledger, intent_id, &terms, now)?;

        let ctx = Context::new(&state.registry, self.oracle, now);
        let approval = {
            let risk = ctx.risk(&state.ledger, state.locks.reservations());
            match kind {
                LockKind::Borrow => risk.check_user_borrow(terms.user, terms.asset, terms.amount),
                LockKind::Withdraw => risk.check_user_withdraw(terms.user, terms.asset, terms.amount),
            }
        }?;

        match kind {
            LockKind::Borrow => state.ledger.finalize_borrow(
                self.cap,
                &state.registry,
                approval,
                intent_id,
                terms.relayer,
                now,
            )?,
            LockKind::Withdraw => state.ledger.finalize_withdraw(
                self.cap,
                &state.registry,
                approval,
                intent_id,
                terms.relayer,
                now,
            )?,
        };
        tracing::debug!(intent = %intent_id.short(), %kind, fee = action.fee, "intent settled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hublend_ledger::StaticPriceOracle;
    use hublend_types::{DepositAttestation, DepositId, DomainId, test_address};

    use super::*;
    use crate::verifier::DevProofVerifier;

    const T0: u64 = 5_000;

    fn config() -> EngineConfig {
        let mut cfg = EngineConfig::new(DomainId(1), vec![DomainId(10)], test_address(200));
        cfg.assets.push(crate::tests::asset_config(1));
        cfg
    }

    fn state(cfg: &EngineConfig) -> (HubState, SettlementCap) {
        let (mut state, cap) = HubState::new(cfg).unwrap();
        for asset in &cfg.assets {
            state.registry.register_asset(cfg.risk_admin, asset.clone()).unwrap();
            state.ledger.init_market(asset.asset, T0).unwrap();
        }
        (state, cap)
    }

    fn supply_batch(id: u64, amount: u128) -> SettlementBatch {
        let mut batch = SettlementBatch::new(BatchId::from_u64(id), DomainId(1), DomainId(10));
        batch.supply_credits.push(CreditAction {
            origin_domain_id: DomainId(10),
            deposit_id: DepositId::from_u64(id),
            user: test_address(5),
            asset: test_address(1),
            amount,
        });
        commitment::seal(&mut batch).unwrap();
        batch
    }

    fn register(state: &mut HubState, batch: &SettlementBatch) {
        for credit in &batch.supply_credits {
            state
                .custody
                .register_deposit(
                    &mut state.ledger,
                    &state.registry,
                    test_address(200),
                    DepositAttestation {
                        origin_domain_id: credit.origin_domain_id,
                        deposit_id: credit.deposit_id,
                        terms: credit.terms(DepositKind::Supply),
                    },
                )
                .unwrap();
        }
    }

    #[test]
    fn supply_credit_settles() {
        let cfg = config();
        let (mut state, cap) = state(&cfg);
        let oracle = StaticPriceOracle::new(3_600);
        let engine = SettlementEngine::new(&cap, &cfg, &DevProofVerifier, &oracle);

        let batch = supply_batch(1, 250);
        register(&mut state, &batch);
        let proof = SettlementProof::dev(&commitment::public_inputs(&batch));
        let receipt = engine.settle_batch(&mut state, &batch, &proof, T0).unwrap();

        assert_eq!(receipt.action_count, 1);
        assert_eq!(state.ledger.supply_balance(test_address(5), test_address(1)).unwrap(), 250);
        assert!(state.guards.is_batch_executed(batch.batch_id));
        assert!(matches!(
            state.ledger.events().last(),
            Some(HubEvent::BatchSettled { action_count: 1, .. })
        ));
        state.verify_invariants().unwrap();

        assert_eq!(
            engine.settle_batch(&mut state, &batch, &proof, T0),
            Err(HubError::BatchAlreadyExecuted(batch.batch_id))
        );
    }

    #[test]
    fn tampered_batch_fails_root_check() {
        let cfg = config();
        let (mut state, cap) = state(&cfg);
        let oracle = StaticPriceOracle::new(3_600);
        let engine = SettlementEngine::new(&cap, &cfg, &DevProofVerifier, &oracle);

        let mut batch = supply_batch(1, 250);
        let proof = SettlementProof::dev(&commitment::public_inputs(&batch));
        batch.supply_credits[0].amount = 251;
        assert!(matches!(
            engine.settle_batch(&mut state, &batch, &proof, T0),
            Err(HubError::ActionsRootMismatch { .. })
        ));
        assert!(!state.guards.is_batch_executed(batch.batch_id));
    }

    #[test]
    fn wrong_domains_and_bad_proof_rejected() {
        let cfg = config();
        let (mut state, cap) = state(&cfg);
        let oracle = StaticPriceOracle::new(3_600);
        let engine = SettlementEngine::new(&cap, &cfg, &DevProofVerifier, &oracle);

        let mut batch = supply_batch(1, 10);
        batch.hub_domain_id = DomainId(2);
        commitment::seal(&mut batch).unwrap();
        let proof = SettlementProof::dev(&commitment::public_inputs(&batch));
        assert!(matches!(
            engine.settle_batch(&mut state, &batch, &proof, T0),
            Err(HubError::WrongHubDomain { .. })
        ));

        let mut batch = supply_batch(2, 10);
        batch.counterparty_domain_id = DomainId(11);
        commitment::seal(&mut batch).unwrap();
        let proof = SettlementProof::dev(&commitment::public_inputs(&batch));
        assert_eq!(
            engine.settle_batch(&mut state, &batch, &proof, T0),
            Err(HubError::UnknownDomain(DomainId(11)))
        );

        let batch = supply_batch(3, 10);
        let proof = SettlementProof::Groth16 { bytes: vec![0; 8] };
        assert_eq!(
            engine.settle_batch(&mut state, &batch, &proof, T0),
            Err(HubError::InvalidProof)
        );
    }

    #[test]
    fn unregistered_deposit_aborts() {
        let cfg = config();
        let (mut state, cap) = state(&cfg);
        let oracle = StaticPriceOracle::new(3_600);
        let engine = SettlementEngine::new(&cap, &cfg, &DevProofVerifier, &oracle);

        let batch = supply_batch(1, 10);
        let proof = SettlementProof::dev(&commitment::public_inputs(&batch));
        assert!(matches!(
            engine.settle_batch(&mut state, &batch, &proof, T0),
            Err(HubError::DepositNotFound { .. })
        ));
    }
}
