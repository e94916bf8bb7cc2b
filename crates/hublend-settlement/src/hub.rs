//! The hub facade: one serialized entry point per external operation.
//!
//! Every mutating call clones the current [`HubState`], runs against the
//! clone, re-checks the bookkeeping invariants and swaps the clone in only
//! on success. A rejected call therefore leaves no trace, buffered events
//! included.
//!
//! Events emitted during a call sit in the working copy's ledger buffer and
//! move to the hub journal on commit, so the committed state always carries
//! an empty buffer and cloning it never copies event history.

use std::sync::Arc;

use hublend_ledger::{
    AccountSnapshot, LiquidationOutcome, Market, PriceOracle, RepayOutcome, Reservations,
    SettlementCap,
};
use hublend_types::{
    Address, AssetConfig, BatchId, Clock, CustodyDeposit, DepositAttestation, DepositKey,
    EngineConfig, FillEvidence, HubError, HubEvent, IntentId, Lock, LockStatus, RateModelParams,
    Result, RiskParams, SettlementBatch, SignedIntent,
};

use crate::{
    context::Context,
    engine::{SettlementEngine, SettlementReceipt},
    intent_auth::{Ed25519IntentAuthenticator, IntentAuthenticator},
    state::HubState,
    verifier::{FillAttestationVerifier, ProofVerifier, SettlementProof},
};

/// A hub instance: configuration, committed state and the collaborators
/// every operation consults.
pub struct Hub {
    config: EngineConfig,
    cap: SettlementCap,
    state: HubState,
    journal: Vec<HubEvent>,
    oracle: Arc<dyn PriceOracle>,
    clock: Arc<dyn Clock>,
    authenticator: Box<dyn IntentAuthenticator>,
    proof_verifier: Box<dyn ProofVerifier>,
    fill_attester: Option<Box<dyn FillAttestationVerifier>>,
}

impl Hub {
    /// Build a hub from a validated config and register its assets.
    ///
    /// Every batch is checked by `proof_verifier`. Intents are authenticated
    /// with ed25519 until replaced with [`Hub::with_authenticator`].
    pub fn new(
        config: EngineConfig,
        oracle: Arc<dyn PriceOracle>,
        clock: Arc<dyn Clock>,
        proof_verifier: Box<dyn ProofVerifier>,
    ) -> Result<Self> {
        config.validate()?;
        let (state, cap) = HubState::new(&config)?;
        let mut hub = Self {
            config,
            cap,
            state,
            journal: Vec::new(),
            oracle,
            clock,
            authenticator: Box::new(Ed25519IntentAuthenticator),
            proof_verifier,
            fill_attester: None,
        };
        let admin = hub.config.risk_admin;
        for asset in hub.config.assets.clone() {
            hub.register_asset(admin, asset)?;
        }
        tracing::info!(
            hub = %hub.config.hub_domain_id,
            assets = hub.state.registry.len(),
            self_attested_fills = hub.config.allow_self_attested_fills,
            "hub initialized"
        );
        Ok(hub)
    }

    /// Replace the ed25519 intent authenticator.
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Box<dyn IntentAuthenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Enable the verified fill-evidence path.
    #[must_use]
    pub fn with_fill_attester(mut self, attester: Box<dyn FillAttestationVerifier>) -> Self {
        self.fill_attester = Some(attester);
        self
    }

    fn now(&self) -> u64 {
        self.clock.now()
    }

    fn commit(&mut self, mut working: HubState) -> Result<()> {
        working.verify_invariants()?;
        self.journal.extend(working.ledger.drain_events());
        self.state = working;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Registry administration
    // -----------------------------------------------------------------------

    /// Register an asset and open its market. Risk admin only.
    pub fn register_asset(&mut self, caller: Address, asset: AssetConfig) -> Result<()> {
        let now = self.now();
        let mut working = self.state.clone();
        let (address, symbol) = (asset.asset, asset.symbol.clone());
        working.registry.register_asset(caller, asset)?;
        working.ledger.init_market(address, now)?;
        tracing::info!(asset = %address, %symbol, "asset registered");
        working.ledger.emit(HubEvent::AssetRegistered {
            asset: address,
            symbol,
        });
        self.commit(working)
    }

    /// Replace an asset's risk parameters. Risk admin only.
    pub fn set_risk_params(&mut self, caller: Address, asset: Address, params: RiskParams) -> Result<()> {
        let mut working = self.state.clone();
        working.registry.set_risk_params(caller, asset, params)?;
        tracing::info!(%asset, ?params, "risk params updated");
        working.ledger.emit(HubEvent::RiskParamsUpdated { asset });
        self.commit(working)
    }

    /// Interest up to now accrues under the old curve.
    pub fn set_rate_model(&mut self, caller: Address, asset: Address, params: RateModelParams) -> Result<()> {
        let now = self.now();
        let mut working = self.state.clone();
        working.ledger.accrue_interest(&working.registry, asset, now)?;
        working.registry.set_rate_model(caller, asset, params)?;
        working.ledger.emit(HubEvent::RiskParamsUpdated { asset });
        self.commit(working)
    }

    /// Enable or disable an asset. Disabled assets take no new locks and
    /// drop out of health-factor valuation. Risk admin only.
    pub fn set_asset_enabled(&mut self, caller: Address, asset: Address, enabled: bool) -> Result<()> {
        let mut working = self.state.clone();
        working.registry.set_enabled(caller, asset, enabled)?;
        tracing::info!(%asset, enabled, "asset toggled");
        working.ledger.emit(HubEvent::RiskParamsUpdated { asset });
        self.commit(working)
    }

    // -----------------------------------------------------------------------
    // Direct ledger operations
    // -----------------------------------------------------------------------

    /// Fund a hub wallet with tokens already held on the hub domain.
    pub fn deposit_tokens(&mut self, owner: Address, asset: Address, amount: u128) -> Result<()> {
        let mut working = self.state.clone();
        working.registry.get(asset)?;
        working.ledger.deposit_tokens(owner, asset, amount)?;
        self.commit(working)
    }

    /// Supply from `user`'s hub wallet. Returns the shares minted.
    pub fn supply(&mut self, user: Address, asset: Address, amount: u128) -> Result<u128> {
        let now = self.now();
        let mut working = self.state.clone();
        let shares = working.ledger.supply(&working.registry, user, asset, amount, now)?;
        self.commit(working)?;
        Ok(shares)
    }

    /// Withdraw to `user`'s hub wallet after a health-factor check. Returns
    /// the shares burned.
    pub fn withdraw(&mut self, user: Address, asset: Address, amount: u128) -> Result<u128> {
        let now = self.now();
        let mut working = self.state.clone();
        working.ledger.accrue_all(&working.registry, now)?;
        let approval = {
            let ctx = Context::new(&working.registry, &*self.oracle, now);
            ctx.risk(&working.ledger, working.locks.reservations())
                .check_user_withdraw(user, asset, amount)?
        };
        let shares = working.ledger.withdraw(&working.registry, approval, now)?;
        self.commit(working)?;
        Ok(shares)
    }

    /// Borrow to `user`'s hub wallet after a health-factor check. Returns the
    /// debt shares minted.
    pub fn borrow(&mut self, user: Address, asset: Address, amount: u128) -> Result<u128> {
        let now = self.now();
        let mut working = self.state.clone();
        working.ledger.accrue_all(&working.registry, now)?;
        let approval = {
            let ctx = Context::new(&working.registry, &*self.oracle, now);
            ctx.risk(&working.ledger, working.locks.reservations())
                .check_user_borrow(user, asset, amount)?
        };
        let shares = working.ledger.borrow(&working.registry, approval, now)?;
        self.commit(working)?;
        Ok(shares)
    }

    /// Repay `user`'s debt from `payer`'s hub wallet.
    pub fn repay(&mut self, payer: Address, user: Address, asset: Address, amount: u128) -> Result<RepayOutcome> {
        let now = self.now();
        let mut working = self.state.clone();
        let outcome = working
            .ledger
            .repay(&working.registry, payer, user, asset, amount, now)?;
        self.commit(working)?;
        Ok(outcome)
    }

    /// Repay part of an unhealthy borrower's debt from the liquidator's hub
    /// wallet and move the seized collateral to the liquidator.
    pub fn liquidate(
        &mut self,
        liquidator: Address,
        borrower: Address,
        debt_asset: Address,
        repay_amount: u128,
        collateral_asset: Address,
    ) -> Result<LiquidationOutcome> {
        let now = self.now();
        let mut working = self.state.clone();
        working.ledger.accrue_all(&working.registry, now)?;
        let approval = {
            let ctx = Context::new(&working.registry, &*self.oracle, now);
            ctx.risk(&working.ledger, working.locks.reservations())
                .check_liquidation(liquidator, borrower, debt_asset, repay_amount, collateral_asset)?
        };
        let outcome = working.ledger.liquidate(&working.registry, approval, now)?;
        self.commit(working)?;
        Ok(outcome)
    }

    /// Bring one market's indexes up to the clock.
    pub fn accrue_interest(&mut self, asset: Address) -> Result<()> {
        let now = self.now();
        let mut working = self.state.clone();
        working.ledger.accrue_interest(&working.registry, asset, now)?;
        self.commit(working)
    }

    // -----------------------------------------------------------------------
    // Locks
    // -----------------------------------------------------------------------

    /// Lock liquidity for a signed borrow or withdraw intent on behalf of
    /// `relayer`.
    pub fn lock(&mut self, relayer: Address, signed: &SignedIntent) -> Result<Lock> {
        let now = self.now();
        let mut working = self.state.clone();
        let lock = {
            let HubState {
                registry,
                ledger,
                locks,
                ..
            } = &mut working;
            let ctx = Context::new(registry, &*self.oracle, now);
            locks.lock(&ctx, ledger, self.authenticator.as_ref(), relayer, signed)?
        };
        self.commit(working)?;
        Ok(lock)
    }

    /// Release an ACTIVE lock whose expiry has passed. Anyone may call.
    pub fn cancel_expired_lock(&mut self, intent_id: IntentId) -> Result<()> {
        let now = self.now();
        let mut working = self.state.clone();
        working
            .locks
            .cancel_expired_lock(&mut working.ledger, intent_id, now)?;
        self.commit(working)
    }

    // -----------------------------------------------------------------------
    // Fill evidence
    // -----------------------------------------------------------------------

    /// Self-attested evidence from the relayer it binds.
    pub fn record_fill_evidence(&mut self, caller: Address, evidence: FillEvidence) -> Result<()> {
        let now = self.now();
        let mut working = self.state.clone();
        working.evidence.record_self_attested(
            &mut working.ledger,
            &working.locks,
            caller,
            evidence,
            now,
        )?;
        self.commit(working)
    }

    /// Evidence carried by an attestation the configured fill attester
    /// accepts.
    pub fn record_verified_fill_evidence(&mut self, evidence: FillEvidence, attestation: &[u8]) -> Result<()> {
        let Some(attester) = self.fill_attester.as_deref() else {
            return Err(HubError::InvalidFillAttestation);
        };
        let now = self.now();
        let mut working = self.state.clone();
        working.evidence.record_verified(
            &mut working.ledger,
            &working.locks,
            attester,
            evidence,
            attestation,
            now,
        )?;
        self.commit(working)
    }

    // -----------------------------------------------------------------------
    // Custody and settlement
    // -----------------------------------------------------------------------

    /// Record an attested deposit from a counterparty domain. Deposit
    /// attester only.
    pub fn register_deposit(&mut self, caller: Address, attestation: DepositAttestation) -> Result<()> {
        if !self.config.is_counterparty(attestation.origin_domain_id) {
            return Err(HubError::UnknownDomain(attestation.origin_domain_id));
        }
        let mut working = self.state.clone();
        working
            .custody
            .register_deposit(&mut working.ledger, &working.registry, caller, attestation)?;
        self.commit(working)
    }

    /// Apply a proven batch. Only the settlement operator may submit.
    pub fn settle_batch(
        &mut self,
        caller: Address,
        batch: &SettlementBatch,
        proof: &SettlementProof,
    ) -> Result<SettlementReceipt> {
        if caller != self.config.settlement_operator {
            return Err(HubError::Unauthorized {
                caller,
                action: "settle batch",
            });
        }
        let now = self.now();
        let mut working = self.state.clone();
        let engine = SettlementEngine::new(
            &self.cap,
            &self.config,
            self.proof_verifier.as_ref(),
            &*self.oracle,
        );
        let receipt = match engine.settle_batch(&mut working, batch, proof, now) {
            Ok(receipt) => receipt,
            Err(err) => {
                tracing::warn!(
                    batch = %batch.batch_id,
                    code = %err,
                    category = %err.category(),
                    "batch rejected"
                );
                return Err(err);
            }
        };
        self.commit(working)?;
        Ok(receipt)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The configuration the hub was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Committed state, read-only.
    #[must_use]
    pub fn state(&self) -> &HubState {
        &self.state
    }

    /// Market state of `asset` at its last accrual.
    pub fn market(&self, asset: Address) -> Result<&Market> {
        self.state.ledger.market(asset)
    }

    /// `user`'s supplied amount of `asset` at the stored index.
    pub fn supply_balance(&self, user: Address, asset: Address) -> Result<u128> {
        self.state.ledger.supply_balance(user, asset)
    }

    /// `user`'s outstanding debt in `asset` at the stored index.
    pub fn debt_balance(&self, user: Address, asset: Address) -> Result<u128> {
        self.state.ledger.debt_balance(user, asset)
    }

    /// Hub wallet balance of `owner` in `asset`.
    #[must_use]
    pub fn wallet_balance(&self, owner: Address, asset: Address) -> u128 {
        self.state.ledger.wallet_balance(owner, asset)
    }

    /// Health factor including live reservations, WAD-scaled.
    pub fn health_factor(&self, user: Address) -> Result<u128> {
        let ctx = Context::new(&self.state.registry, &*self.oracle, self.now());
        ctx.risk(&self.state.ledger, self.state.locks.reservations())
            .health_factor(user)
    }

    /// Collateral, capacity, debt and health factor of `user`.
    pub fn account_snapshot(&self, user: Address) -> Result<AccountSnapshot> {
        let ctx = Context::new(&self.state.registry, &*self.oracle, self.now());
        ctx.risk(&self.state.ledger, self.state.locks.reservations())
            .account_snapshot(user)
    }

    /// The lock for `intent_id`, in any status.
    #[must_use]
    pub fn lock_info(&self, intent_id: IntentId) -> Option<&Lock> {
        self.state.locks.get(intent_id)
    }

    /// Status of `intent_id`; `NONE` if it was never locked.
    #[must_use]
    pub fn lock_status(&self, intent_id: IntentId) -> LockStatus {
        self.state.locks.status(intent_id)
    }

    /// Amounts currently held back by ACTIVE locks.
    #[must_use]
    pub fn reservations(&self) -> &Reservations {
        self.state.locks.reservations()
    }

    /// Fill evidence recorded for `intent_id`.
    #[must_use]
    pub fn fill_evidence(&self, intent_id: IntentId) -> Option<&FillEvidence> {
        self.state.evidence.get(intent_id)
    }

    /// Custody record of a deposit.
    #[must_use]
    pub fn deposit(&self, key: DepositKey) -> Option<&CustodyDeposit> {
        self.state.custody.get(key)
    }

    /// True once `batch_id` has settled.
    #[must_use]
    pub fn is_batch_executed(&self, batch_id: BatchId) -> bool {
        self.state.guards.is_batch_executed(batch_id)
    }

    /// True once the deposit was credited by a batch.
    #[must_use]
    pub fn is_deposit_settled(&self, key: DepositKey) -> bool {
        self.state.guards.is_deposit_settled(key)
    }

    /// True once the intent was finalized by a batch.
    #[must_use]
    pub fn is_intent_settled(&self, intent_id: IntentId) -> bool {
        self.state.guards.is_intent_settled(intent_id)
    }

    /// Committed events not yet drained.
    #[must_use]
    pub fn events(&self) -> &[HubEvent] {
        &self.journal
    }

    /// Take every committed event, oldest first.
    pub fn drain_events(&mut self) -> Vec<HubEvent> {
        std::mem::take(&mut self.journal)
    }
}
