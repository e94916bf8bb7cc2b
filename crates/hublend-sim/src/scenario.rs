//! The demo lifecycle: custody supply → lock → fill → settle → accrue →
//! repay with surplus.

use ed25519_dalek::SigningKey;
use hublend_ledger::{AccountSnapshot, Market, StaticPriceOracle};
use hublend_settlement::{Hub, SettlementProof, SettlementReceipt, commitment};
use hublend_types::{
    Address, BatchId, Clock, CreditAction, DepositAttestation, DepositId, DepositKind,
    DepositTerms, DomainId, FillEvidence, FinalizeAction, HubError, HubEvent, Intent, IntentKind,
    ManualClock, Result, SettlementBatch, SignedIntent, address_from_key, math,
};
use rand::rngs::OsRng;
use serde::Serialize;

use crate::sim_config::SimConfig;

const DAY: u64 = 86_400;
const RELAYER_FEE_BPS: u128 = 10;

/// Everything the scenario prints.
#[derive(Debug, Serialize)]
pub struct Report {
    pub borrower: Address,
    pub receipts: Vec<SettlementReceipt>,
    pub snapshot: AccountSnapshot,
    pub markets: Vec<Market>,
    pub events: Vec<HubEvent>,
}

struct Runner<'a> {
    hub: Hub,
    sim: &'a SimConfig,
    spoke: DomainId,
    next_batch: u64,
    next_deposit: u64,
    receipts: Vec<SettlementReceipt>,
}

impl Runner<'_> {
    fn deposit(&mut self, kind: DepositKind, user: Address, asset: Address, amount: u128) -> Result<CreditAction> {
        let deposit_id = DepositId::from_u64(self.next_deposit);
        self.next_deposit += 1;
        let attestation = DepositAttestation {
            origin_domain_id: self.spoke,
            deposit_id,
            terms: DepositTerms {
                kind,
                user,
                asset,
                amount,
            },
        };
        self.hub
            .register_deposit(self.sim.engine.deposit_attester, attestation)?;
        Ok(CreditAction {
            origin_domain_id: self.spoke,
            deposit_id,
            user,
            asset,
            amount,
        })
    }

    fn settle(&mut self, fill: impl FnOnce(&mut SettlementBatch)) -> Result<()> {
        let mut batch = SettlementBatch::new(
            BatchId::from_u64(self.next_batch),
            self.sim.engine.hub_domain_id,
            self.spoke,
        );
        self.next_batch += 1;
        fill(&mut batch);
        commitment::seal(&mut batch)?;
        let proof = SettlementProof::dev(&commitment::public_inputs(&batch));
        let receipt = self
            .hub
            .settle_batch(self.sim.engine.settlement_operator, &batch, &proof)?;
        self.receipts.push(receipt);
        Ok(())
    }
}

/// Drive `hub` through the demo lifecycle and collect the report.
pub fn run(hub: Hub, sim: &SimConfig, oracle: &StaticPriceOracle, clock: &ManualClock) -> Result<Report> {
    let borrow = sim.asset(&sim.borrow_symbol)?.clone();
    let collateral = sim.asset(&sim.collateral_symbol)?.clone();
    let spoke = *sim
        .engine
        .counterparty_domain_ids
        .first()
        .ok_or_else(|| HubError::InvalidConfig("no counterparty domain".into()))?;
    let borrow_token = borrow
        .companions
        .iter()
        .find(|c| c.domain_id == spoke)
        .ok_or(HubError::UnknownDomain(spoke))?
        .token;
    let mut runner = Runner {
        hub,
        sim,
        spoke,
        next_batch: 1,
        next_deposit: 1,
        receipts: Vec::new(),
    };

    // Pool liquidity from a hub-side LP.
    let lp = Address::repeat_byte(0xc1);
    let borrow_unit = math::pow10(borrow.decimals)?;
    let liquidity = math::mul_div(100_000, borrow_unit, 1)?;
    runner.hub.deposit_tokens(lp, borrow.asset, liquidity)?;
    runner.hub.supply(lp, borrow.asset, liquidity)?;

    // Collateral arrives from the spoke through custody.
    let key = SigningKey::generate(&mut OsRng);
    let user = address_from_key(&key.verifying_key());
    let collateral_unit = math::pow10(collateral.decimals)?;
    let collateral_amount = math::mul_div(2, collateral_unit, 1)?;
    let credit = runner.deposit(DepositKind::Supply, user, collateral.asset, collateral_amount)?;
    runner.settle(|b| b.supply_credits.push(credit))?;
    tracing::info!(%user, collateral = collateral_amount, "collateral credited");

    // Borrow a quarter of the collateral value through a locked intent.
    let value_e8 = math::mul_div(
        collateral_amount,
        sim.price_of(&collateral.symbol)?,
        collateral_unit,
    )?;
    let amount = math::mul_div(value_e8 / 4, borrow_unit, sim.price_of(&borrow.symbol)?)?;
    let intent = Intent {
        kind: IntentKind::Borrow,
        user,
        spoke_domain_id: spoke,
        token: borrow_token,
        amount,
        recipient: user,
        deadline: clock.now() + DAY,
        nonce: 1,
    };
    let lock = runner
        .hub
        .lock(sim.relayer, &SignedIntent::sign(intent, &key))?;

    let fee = math::apply_bps(amount, RELAYER_FEE_BPS)?;
    runner
        .hub
        .record_fill_evidence(sim.relayer, FillEvidence::new(lock.intent_id, lock.terms, fee))?;
    let finalization = FinalizeAction {
        intent_id: lock.intent_id,
        user,
        asset: borrow.asset,
        amount,
        fee,
        relayer: sim.relayer,
    };
    runner.settle(|b| b.borrow_finalizations.push(finalization))?;
    tracing::info!(intent = %lock.intent_id.short(), amount, fee, "borrow settled");

    // A month of interest, then a repay with one unit of surplus.
    clock.advance(30 * DAY);
    for asset in &sim.engine.assets {
        oracle.set_price(asset.asset, sim.price_of(&asset.symbol)?, clock.now())?;
    }
    runner.hub.accrue_interest(borrow.asset)?;
    let debt = runner.hub.debt_balance(user, borrow.asset)?;
    let repay = math::add(debt, borrow_unit)?;
    let credit = runner.deposit(DepositKind::Repay, user, borrow.asset, repay)?;
    runner.settle(|b| b.repay_credits.push(credit))?;
    tracing::info!(debt, repay, "debt repaid");

    let snapshot = runner.hub.account_snapshot(user)?;
    let markets = runner
        .hub
        .state()
        .ledger
        .markets()
        .cloned()
        .collect();
    let events = runner.hub.drain_events();
    Ok(Report {
        borrower: user,
        receipts: runner.receipts,
        snapshot,
        markets,
        events,
    })
}
