//! End-to-end tests across the hub: locks, fills, custody and settlement.
//!
//! Each scenario drives a [`Hub`] only through its public operations and
//! checks the externally visible results: balances, lock status, replay
//! guards and the event stream.

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use hublend_ledger::StaticPriceOracle;
use hublend_settlement::{DevProofVerifier, Hub, SettlementProof, SettlementReceipt, commitment};
use hublend_types::*;
use rand::{Rng, SeedableRng, rngs::OsRng, rngs::StdRng};

const T0: u64 = 1_700_000_000;
const SPOKE: DomainId = DomainId(10);
const E8: u128 = 100_000_000;
const USDC_UNIT: u128 = 1_000_000;
const WETH_UNIT: u128 = 100_000_000;

fn admin() -> Address {
    test_address(200)
}
fn operator() -> Address {
    test_address(201)
}
fn attester() -> Address {
    test_address(202)
}
fn relayer() -> Address {
    test_address(77)
}
fn lp() -> Address {
    test_address(60)
}
fn liquidator() -> Address {
    test_address(61)
}
fn usdc() -> Address {
    test_address(1)
}
fn weth() -> Address {
    test_address(2)
}
fn spoke_token(asset: Address) -> Address {
    if asset == usdc() { test_address(101) } else { test_address(102) }
}

fn asset(n: u8, symbol: &str, decimals: u8) -> AssetConfig {
    AssetConfig {
        asset: test_address(n),
        symbol: symbol.into(),
        decimals,
        companions: vec![CompanionToken {
            domain_id: SPOKE,
            token: test_address(100 + n),
        }],
        risk: RiskParams::default(),
        reserve_factor_bps: 1_000,
        rate_model: RateModelParams::default(),
        min_price_e8: 1,
        max_price_e8: u128::from(u64::MAX),
        enabled: true,
    }
}

/// A hub with USDC (6 decimals, $1) and WETH (8 decimals, $2000), and an LP
/// that has supplied 10,000 USDC.
struct Harness {
    hub: Hub,
    oracle: Arc<StaticPriceOracle>,
    clock: ManualClock,
    next_batch: u64,
    next_deposit: u64,
}

impl Harness {
    fn new() -> Self {
        let mut cfg = EngineConfig::new(DomainId(1), vec![SPOKE], admin());
        cfg.settlement_operator = operator();
        cfg.deposit_attester = attester();
        cfg.lock_ttl_secs = 600;
        cfg.assets = vec![asset(1, "USDC", 6), asset(2, "WETH", 8)];

        let clock = ManualClock::new(T0);
        let oracle = Arc::new(StaticPriceOracle::new(3_600));
        oracle.set_price(usdc(), E8, T0).unwrap();
        oracle.set_price(weth(), 2_000 * E8, T0).unwrap();
        let hub = Hub::new(
            cfg,
            oracle.clone(),
            Arc::new(clock.clone()),
            Box::new(DevProofVerifier),
        )
        .unwrap();

        let mut h = Self {
            hub,
            oracle,
            clock,
            next_batch: 1,
            next_deposit: 1,
        };
        h.fund_and_supply(lp(), usdc(), 10_000 * USDC_UNIT);
        h.hub.drain_events();
        h
    }

    fn fund_and_supply(&mut self, user: Address, asset: Address, amount: u128) {
        self.hub.deposit_tokens(user, asset, amount).unwrap();
        self.hub.supply(user, asset, amount).unwrap();
    }

    /// A key-backed borrower holding 1 WETH of collateral.
    fn borrower(&mut self) -> (SigningKey, Address) {
        let key = SigningKey::generate(&mut OsRng);
        let user = address_from_key(&key.verifying_key());
        self.fund_and_supply(user, weth(), WETH_UNIT);
        (key, user)
    }

    fn set_price(&self, asset: Address, price_e8: u128) {
        self.oracle.set_price(asset, price_e8, self.clock.now()).unwrap();
    }

    /// Advance time and refresh both quotes at their current values.
    fn tick(&self, secs: u64, weth_price: u128) {
        self.clock.advance(secs);
        self.set_price(usdc(), E8);
        self.set_price(weth(), weth_price);
    }

    fn intent(key: &SigningKey, kind: IntentKind, asset: Address, amount: u128, nonce: u64) -> SignedIntent {
        let user = address_from_key(&key.verifying_key());
        let intent = Intent {
            kind,
            user,
            spoke_domain_id: SPOKE,
            token: spoke_token(asset),
            amount,
            recipient: user,
            deadline: T0 + 86_400,
            nonce,
        };
        SignedIntent::sign(intent, key)
    }

    fn batch(&mut self) -> SettlementBatch {
        let id = self.next_batch;
        self.next_batch += 1;
        SettlementBatch::new(BatchId::from_u64(id), DomainId(1), SPOKE)
    }

    /// Register a custody deposit and return the matching credit action.
    fn deposit(&mut self, kind: DepositKind, user: Address, asset: Address, amount: u128) -> CreditAction {
        let deposit_id = DepositId::from_u64(self.next_deposit);
        self.next_deposit += 1;
        let attestation = DepositAttestation {
            origin_domain_id: SPOKE,
            deposit_id,
            terms: DepositTerms {
                kind,
                user,
                asset,
                amount,
            },
        };
        self.hub.register_deposit(attester(), attestation).unwrap();
        CreditAction {
            origin_domain_id: SPOKE,
            deposit_id,
            user,
            asset,
            amount,
        }
    }

    /// Relayer records fill evidence for `lock` with `fee`.
    fn fill(&mut self, lock: &Lock, fee: u128) {
        let evidence = FillEvidence::new(lock.intent_id, lock.terms, fee);
        self.hub.record_fill_evidence(lock.terms.relayer, evidence).unwrap();
    }

    fn settle(&mut self, mut batch: SettlementBatch) -> Result<SettlementReceipt> {
        commitment::seal(&mut batch)?;
        let proof = SettlementProof::dev(&commitment::public_inputs(&batch));
        self.hub.settle_batch(operator(), &batch, &proof)
    }
}

fn finalize(lock: &Lock, fee: u128) -> FinalizeAction {
    FinalizeAction {
        intent_id: lock.intent_id,
        user: lock.terms.user,
        asset: lock.terms.asset,
        amount: lock.terms.amount,
        fee,
        relayer: lock.terms.relayer,
    }
}

// =========================================================================
// Locks
// =========================================================================

#[test]
fn lock_then_over_lock_fails_on_liquidity() {
    let mut h = Harness::new();
    let (key, _) = h.borrower();
    let (key2, _) = h.borrower();
    // Shrink the pool to 200 USDC of cash.
    h.hub
        .withdraw(lp(), usdc(), 10_000 * USDC_UNIT - 200 * USDC_UNIT)
        .unwrap();

    let lock = h
        .hub
        .lock(relayer(), &Harness::intent(&key, IntentKind::Borrow, usdc(), 100 * USDC_UNIT, 1))
        .unwrap();
    assert_eq!(lock.status, LockStatus::Active);
    assert_eq!(h.hub.reservations().liquidity(usdc()), 100 * USDC_UNIT);

    let over = Harness::intent(&key2, IntentKind::Borrow, usdc(), 150 * USDC_UNIT, 1);
    let err = h.hub.lock(relayer(), &over).unwrap_err();
    assert!(matches!(err, HubError::InsufficientLiquidity { .. }), "got {err}");
    assert_eq!(err.category(), ErrorCategory::Capacity);
    assert_eq!(h.hub.reservations().liquidity(usdc()), 100 * USDC_UNIT);

    // The rejected lock did not spend its nonce.
    let smaller = Harness::intent(&key2, IntentKind::Borrow, usdc(), 100 * USDC_UNIT, 1);
    h.hub.lock(relayer(), &smaller).unwrap();
    assert_eq!(h.hub.reservations().liquidity(usdc()), 200 * USDC_UNIT);
}

#[test]
fn lock_respects_health_factor_including_reservations() {
    let mut h = Harness::new();
    let (key, user) = h.borrower();
    // 1 WETH at $2000, 80% threshold: 1600 USDC of headroom.
    h.hub
        .lock(relayer(), &Harness::intent(&key, IntentKind::Borrow, usdc(), 1_000 * USDC_UNIT, 1))
        .unwrap();
    let err = h
        .hub
        .lock(relayer(), &Harness::intent(&key, IntentKind::Borrow, usdc(), 700 * USDC_UNIT, 2))
        .unwrap_err();
    assert!(matches!(err, HubError::BorrowNotAllowed { .. }), "got {err}");
    assert_eq!(h.hub.reservations().debt(user, usdc()), 1_000 * USDC_UNIT);
    assert!(h.hub.health_factor(user).unwrap() >= constants::WAD);
}

#[test]
fn expired_lock_cancelled_and_cannot_settle() {
    let mut h = Harness::new();
    let (key, _) = h.borrower();
    let lock = h
        .hub
        .lock(relayer(), &Harness::intent(&key, IntentKind::Borrow, usdc(), 100 * USDC_UNIT, 1))
        .unwrap();
    h.fill(&lock, 0);

    assert!(matches!(
        h.hub.cancel_expired_lock(lock.intent_id),
        Err(HubError::LockNotExpired { .. })
    ));
    h.tick(600, 2_000 * E8);
    h.hub.cancel_expired_lock(lock.intent_id).unwrap();
    assert_eq!(h.hub.lock_status(lock.intent_id), LockStatus::Cancelled);
    assert!(h.hub.reservations().is_empty());

    let mut batch = h.batch();
    batch.borrow_finalizations.push(finalize(&lock, 0));
    let err = h.settle(batch).unwrap_err();
    assert!(matches!(err, HubError::LockNotActive { .. }), "got {err}");
    assert!(!h.hub.is_intent_settled(lock.intent_id));
}

// =========================================================================
// Settlement lifecycles
// =========================================================================

#[test]
fn borrow_intent_settles_end_to_end() {
    let mut h = Harness::new();
    let (key, user) = h.borrower();
    let lock = h
        .hub
        .lock(relayer(), &Harness::intent(&key, IntentKind::Borrow, usdc(), 100 * USDC_UNIT, 1))
        .unwrap();
    h.fill(&lock, 2 * USDC_UNIT);

    let mut batch = h.batch();
    batch.borrow_finalizations.push(finalize(&lock, 2 * USDC_UNIT));
    let receipt = h.settle(batch.clone()).unwrap();
    assert_eq!(receipt.action_count, 1);

    assert_eq!(h.hub.debt_balance(user, usdc()).unwrap(), 100 * USDC_UNIT);
    assert_eq!(h.hub.wallet_balance(relayer(), usdc()), 100 * USDC_UNIT);
    assert_eq!(h.hub.lock_status(lock.intent_id), LockStatus::Consumed);
    assert!(h.hub.fill_evidence(lock.intent_id).unwrap().consumed);
    assert!(h.hub.is_intent_settled(lock.intent_id));
    assert!(h.hub.reservations().is_empty());

    let events = h.hub.drain_events();
    let tail: Vec<_> = events.iter().rev().take(3).collect();
    assert!(matches!(tail[0], HubEvent::BatchSettled { action_count: 1, .. }));
    assert!(matches!(tail[1], HubEvent::BorrowFinalized { .. }));
    assert!(matches!(tail[2], HubEvent::LockConsumed { reserved_liquidity: 0, .. }));
}

#[test]
fn withdraw_intent_settles_end_to_end() {
    let mut h = Harness::new();
    let (key, user) = h.borrower();
    let lock = h
        .hub
        .lock(relayer(), &Harness::intent(&key, IntentKind::Withdraw, weth(), WETH_UNIT / 4, 1))
        .unwrap();
    assert_eq!(h.hub.reservations().withdraw(user, weth()), WETH_UNIT / 4);
    h.fill(&lock, 0);

    let mut batch = h.batch();
    batch.withdraw_finalizations.push(finalize(&lock, 0));
    h.settle(batch).unwrap();

    assert_eq!(h.hub.supply_balance(user, weth()).unwrap(), WETH_UNIT * 3 / 4);
    assert_eq!(h.hub.wallet_balance(relayer(), weth()), WETH_UNIT / 4);
    assert!(h.hub.reservations().is_empty());
}

#[test]
fn supply_credit_from_custody() {
    let mut h = Harness::new();
    let user = test_address(5);
    let credit = h.deposit(DepositKind::Supply, user, usdc(), 500 * USDC_UNIT);
    let key = (credit.origin_domain_id, credit.deposit_id);
    assert!(!h.hub.deposit(key).unwrap().consumed);

    let mut batch = h.batch();
    batch.supply_credits.push(credit);
    h.settle(batch).unwrap();

    assert_eq!(h.hub.supply_balance(user, usdc()).unwrap(), 500 * USDC_UNIT);
    assert!(h.hub.deposit(key).unwrap().consumed);
    assert!(h.hub.is_deposit_settled(key));
    assert_eq!(h.hub.state().custody.held(usdc()), 0);
}

#[test]
fn repay_credit_above_debt_refunds_surplus() {
    let mut h = Harness::new();
    let (_, user) = h.borrower();
    h.hub.borrow(user, usdc(), 50).unwrap();
    assert_eq!(h.hub.debt_balance(user, usdc()).unwrap(), 50);
    let wallet_before = h.hub.wallet_balance(user, usdc());

    let credit = h.deposit(DepositKind::Repay, user, usdc(), 80);
    let mut batch = h.batch();
    batch.repay_credits.push(credit);
    let receipt = h.settle(batch).unwrap();

    assert_eq!(receipt.refunded, 30);
    assert_eq!(h.hub.debt_balance(user, usdc()).unwrap(), 0);
    assert_eq!(h.hub.wallet_balance(user, usdc()), wallet_before + 30);
    assert!(h.hub.events().iter().any(|e| matches!(
        e,
        HubEvent::RepaySurplusRefunded { amount: 30, .. }
    )));
}

// =========================================================================
// Atomicity and replay
// =========================================================================

#[test]
fn one_unit_evidence_mismatch_aborts_whole_batch() {
    let mut h = Harness::new();
    let (key, user) = h.borrower();
    let supplier = test_address(5);
    let credit = h.deposit(DepositKind::Supply, supplier, usdc(), 500 * USDC_UNIT);
    let lock = h
        .hub
        .lock(relayer(), &Harness::intent(&key, IntentKind::Borrow, usdc(), 100 * USDC_UNIT, 1))
        .unwrap();
    h.fill(&lock, 0);
    h.hub.drain_events();

    let mut bad = finalize(&lock, 0);
    bad.amount += 1;
    let mut batch = h.batch();
    let batch_id = batch.batch_id;
    batch.supply_credits.push(credit);
    batch.borrow_finalizations.push(bad);
    let err = h.settle(batch).unwrap_err();
    assert_eq!(
        err,
        HubError::FieldMismatch {
            context: "fill evidence",
            field: "amount"
        }
    );

    // Nothing from the batch survived, the supply credit included.
    let key = (credit.origin_domain_id, credit.deposit_id);
    assert!(!h.hub.is_batch_executed(batch_id));
    assert!(!h.hub.is_deposit_settled(key));
    assert!(!h.hub.deposit(key).unwrap().consumed);
    assert_eq!(h.hub.supply_balance(supplier, usdc()).unwrap(), 0);
    assert_eq!(h.hub.lock_status(lock.intent_id), LockStatus::Active);
    assert!(!h.hub.fill_evidence(lock.intent_id).unwrap().consumed);
    assert_eq!(h.hub.debt_balance(user, usdc()).unwrap(), 0);
    assert!(h.hub.events().is_empty());

    // The corrected batch under the same id goes through.
    let mut batch = SettlementBatch::new(batch_id, DomainId(1), SPOKE);
    batch.supply_credits.push(credit);
    batch.borrow_finalizations.push(finalize(&lock, 0));
    h.settle(batch).unwrap();
    assert_eq!(h.hub.supply_balance(supplier, usdc()).unwrap(), 500 * USDC_UNIT);
    assert_eq!(h.hub.debt_balance(user, usdc()).unwrap(), 100 * USDC_UNIT);
}

#[test]
fn finalization_rechecks_risk_after_price_move() {
    let mut h = Harness::new();
    let (key, user) = h.borrower();
    let lock = h
        .hub
        .lock(relayer(), &Harness::intent(&key, IntentKind::Borrow, usdc(), 1_500 * USDC_UNIT, 1))
        .unwrap();
    h.fill(&lock, 0);
    h.set_price(weth(), 1_800 * E8);

    let mut batch = h.batch();
    batch.borrow_finalizations.push(finalize(&lock, 0));
    let err = h.settle(batch).unwrap_err();
    assert!(matches!(err, HubError::BorrowNotAllowed { .. }), "got {err}");
    assert_eq!(h.hub.lock_status(lock.intent_id), LockStatus::Active);
    assert_eq!(h.hub.debt_balance(user, usdc()).unwrap(), 0);
}

#[test]
fn replays_rejected() {
    let mut h = Harness::new();
    let credit = h.deposit(DepositKind::Supply, test_address(5), usdc(), 10);
    let mut batch = h.batch();
    batch.supply_credits.push(credit);
    h.settle(batch.clone()).unwrap();

    assert!(matches!(
        h.settle(batch),
        Err(HubError::BatchAlreadyExecuted(_))
    ));

    let mut again = h.batch();
    again.supply_credits.push(credit);
    assert!(matches!(
        h.settle(again),
        Err(HubError::DepositAlreadySettled { .. })
    ));
}

#[test]
fn intent_settles_only_once() {
    let mut h = Harness::new();
    let (key, _) = h.borrower();
    let lock = h
        .hub
        .lock(relayer(), &Harness::intent(&key, IntentKind::Borrow, usdc(), 10, 1))
        .unwrap();
    h.fill(&lock, 0);
    let mut batch = h.batch();
    batch.borrow_finalizations.push(finalize(&lock, 0));
    h.settle(batch).unwrap();

    let mut again = h.batch();
    again.borrow_finalizations.push(finalize(&lock, 0));
    assert_eq!(
        h.settle(again),
        Err(HubError::IntentAlreadySettled(lock.intent_id))
    );
    assert!(matches!(
        h.hub.lock(relayer(), &Harness::intent(&key, IntentKind::Borrow, usdc(), 10, 1)),
        Err(HubError::LockAlreadyExists(_))
    ));
}

#[test]
fn oversized_batch_rejected() {
    let mut h = Harness::new();
    let mut batch = h.batch();
    for n in 0..=constants::MAX_BATCH_ACTIONS as u64 {
        batch.supply_credits.push(CreditAction {
            origin_domain_id: SPOKE,
            deposit_id: DepositId::from_u64(1_000 + n),
            user: test_address(5),
            asset: usdc(),
            amount: 1,
        });
    }
    assert!(matches!(
        h.settle(batch),
        Err(HubError::BatchTooLarge { count: 51, max: 50 })
    ));
}

// =========================================================================
// Liquidation
// =========================================================================

#[test]
fn liquidation_after_price_drop() {
    let mut h = Harness::new();
    let (_, borrower) = h.borrower();
    h.hub.borrow(borrower, usdc(), 1_500 * USDC_UNIT).unwrap();

    let err = h
        .hub
        .liquidate(liquidator(), borrower, usdc(), 500 * USDC_UNIT, weth())
        .unwrap_err();
    assert!(matches!(err, HubError::NotLiquidatable { .. }));

    h.set_price(weth(), 1_800 * E8);
    assert!(h.hub.account_snapshot(borrower).unwrap().liquidatable);

    h.hub.deposit_tokens(liquidator(), usdc(), 500 * USDC_UNIT).unwrap();
    let outcome = h
        .hub
        .liquidate(liquidator(), borrower, usdc(), 500 * USDC_UNIT, weth())
        .unwrap();
    // 500 USDC · 1.05 / 1800 = 0.29166666 WETH
    assert_eq!(outcome.repaid, 500 * USDC_UNIT);
    assert_eq!(outcome.seized, 29_166_666);
    assert_eq!(h.hub.supply_balance(liquidator(), weth()).unwrap(), outcome.seized);
    assert_eq!(h.hub.debt_balance(borrower, usdc()).unwrap(), 1_000 * USDC_UNIT);
    assert_eq!(h.hub.wallet_balance(liquidator(), usdc()), 0);

    // Healthy again: a second attempt reverts.
    assert!(h.hub.health_factor(borrower).unwrap() >= constants::WAD);
    let err = h
        .hub
        .liquidate(liquidator(), borrower, usdc(), 100 * USDC_UNIT, weth())
        .unwrap_err();
    assert!(matches!(err, HubError::NotLiquidatable { .. }));
}

#[test]
fn liquidation_repay_clamped_to_outstanding_debt() {
    let mut h = Harness::new();
    let (_, borrower) = h.borrower();
    h.hub.borrow(borrower, usdc(), 1_500 * USDC_UNIT).unwrap();
    h.set_price(weth(), 1_800 * E8);
    h.hub.deposit_tokens(liquidator(), usdc(), 5_000 * USDC_UNIT).unwrap();

    let outcome = h
        .hub
        .liquidate(liquidator(), borrower, usdc(), u128::MAX, weth())
        .unwrap();
    // 1500 USDC · 1.05 / 1800 = 0.875 WETH
    assert_eq!(outcome.repaid, 1_500 * USDC_UNIT);
    assert_eq!(outcome.seized, 87_500_000);
    assert_eq!(h.hub.debt_balance(borrower, usdc()).unwrap(), 0);
    assert_eq!(h.hub.state().ledger.debt_shares(borrower, usdc()), 0);
    assert_eq!(h.hub.wallet_balance(liquidator(), usdc()), 3_500 * USDC_UNIT);
    assert_eq!(h.hub.supply_balance(borrower, weth()).unwrap(), 12_500_000);
    assert_eq!(h.hub.supply_balance(liquidator(), weth()).unwrap(), 87_500_000);
}

// =========================================================================
// Randomized properties
// =========================================================================

#[test]
fn indexes_never_decrease() {
    let mut h = Harness::new();
    let (_, user) = h.borrower();
    let mut rng = StdRng::seed_from_u64(7);
    let mut last = (0u128, 0u128);

    for _ in 0..200 {
        h.tick(rng.gen_range(0..7_200), 2_000 * E8);
        match rng.gen_range(0..4) {
            0 => {
                let _ = h.hub.borrow(user, usdc(), rng.gen_range(1..200) * USDC_UNIT);
            }
            1 => {
                let amount = rng.gen_range(1..200) * USDC_UNIT;
                h.hub.deposit_tokens(user, usdc(), amount).unwrap();
                let _ = h.hub.repay(user, user, usdc(), amount);
            }
            2 => {
                let amount = rng.gen_range(1..500) * USDC_UNIT;
                h.fund_and_supply(lp(), usdc(), amount);
            }
            _ => {
                let _ = h.hub.withdraw(lp(), usdc(), rng.gen_range(1..500) * USDC_UNIT);
            }
        }
        h.hub.accrue_interest(usdc()).unwrap();
        let market = h.hub.market(usdc()).unwrap();
        assert!(market.supply_index >= last.0);
        assert!(market.borrow_index >= last.1);
        assert!(market.supply_index >= constants::RAY);
        last = (market.supply_index, market.borrow_index);
    }
    assert!(last.1 > constants::RAY, "debt was outstanding, so interest accrued");
}

#[test]
fn reservations_track_active_locks() {
    let mut h = Harness::new();
    let mut rng = StdRng::seed_from_u64(11);
    let mut locks = Vec::new();

    for nonce in 0..40u64 {
        if rng.gen_bool(0.6) || locks.is_empty() {
            let (key, _) = h.borrower();
            let kind = if rng.gen_bool(0.5) { IntentKind::Borrow } else { IntentKind::Withdraw };
            let (asset, amount) = match kind {
                IntentKind::Borrow => (usdc(), rng.gen_range(1..400) * USDC_UNIT),
                _ => (weth(), rng.gen_range(1..50) * WETH_UNIT / 100),
            };
            if let Ok(lock) = h.hub.lock(relayer(), &Harness::intent(&key, kind, asset, amount, nonce)) {
                locks.push(lock);
            }
        } else {
            h.tick(601, 2_000 * E8);
            let lock: Lock = locks.swap_remove(rng.gen_range(0..locks.len()));
            // Locks created before this tick are all past expiry.
            h.hub.cancel_expired_lock(lock.intent_id).unwrap();
        }

        let active: Vec<&Lock> = locks.iter().collect();
        for asset in [usdc(), weth()] {
            let sum: u128 = active
                .iter()
                .filter(|l| l.terms.asset == asset)
                .map(|l| l.terms.amount)
                .sum();
            assert_eq!(h.hub.reservations().liquidity(asset), sum);
        }
        h.hub.state().locks.verify_reservations().unwrap();
    }
}
