//! Lock / reservation manager.
//!
//! A lock holds pool liquidity and either debt or withdraw capacity for one
//! intent while a relayer fulfills it on the spoke.
//!
//! ```text
//!          lock()                consume_lock()  [settlement, now ≤ expiry]
//!   NONE ─────────► ACTIVE ──────────────────────► CONSUMED
//!                     │
//!                     │ cancel_expired_lock()    [anyone, now ≥ expiry]
//!                     └──────────────────────────► CANCELLED
//! ```
//!
//! No other transitions exist. An intent that has ever been locked can never
//! be locked again. Checking capacity and reserving it happen in the same
//! call, so a second lock always observes the first one's reservation.

use std::collections::{BTreeSet, HashMap};

use hublend_ledger::{Ledger, Reservations, SettlementCap};
use hublend_types::{
    Address, HubError, HubEvent, IntentId, Lock, LockKind, LockStatus, LockTerms, Result,
    SignedIntent,
};

use crate::{
    context::Context,
    intent_auth::{IntentAuthenticator, NonceRegistry},
};

/// Every lock ever created, the live reservations they hold, and the spent
/// intent nonces.
#[derive(Debug, Clone)]
pub struct LockManager {
    ledger_id: u64,
    lock_ttl_secs: u64,
    locks: HashMap<IntentId, Lock>,
    /// Intents whose lock is ACTIVE.
    active: BTreeSet<IntentId>,
    reservations: Reservations,
    nonces: NonceRegistry,
}

impl LockManager {
    /// Create a manager bound to `ledger`'s settlement capability.
    #[must_use]
    pub fn new(ledger: &Ledger, lock_ttl_secs: u64) -> Self {
        Self {
            ledger_id: ledger.id(),
            lock_ttl_secs,
            locks: HashMap::new(),
            active: BTreeSet::new(),
            reservations: Reservations::new(),
            nonces: NonceRegistry::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Authenticate a borrow/withdraw intent, check capacity and reserve it.
    pub fn lock(
        &mut self,
        ctx: &Context<'_>,
        ledger: &mut Ledger,
        authenticator: &dyn IntentAuthenticator,
        relayer: Address,
        signed: &SignedIntent,
    ) -> Result<Lock> {
        if relayer == Address::ZERO {
            return Err(HubError::ZeroAddress { what: "relayer" });
        }
        let intent_id = authenticator.authenticate(signed, ctx.now)?;
        if self.locks.contains_key(&intent_id) {
            return Err(HubError::LockAlreadyExists(intent_id));
        }
        let intent = &signed.intent;
        let kind = LockKind::try_from(intent.kind)?;
        if intent.amount == 0 {
            return Err(HubError::ZeroAmount);
        }
        self.nonces.consume(intent.user, intent.nonce)?;

        let asset = ctx.registry.resolve(intent.spoke_domain_id, intent.token)?;
        ctx.registry.enabled(asset)?;
        ledger.accrue_all(ctx.registry, ctx.now)?;

        let (user, amount) = (intent.user, intent.amount);
        let risk = ctx.risk(ledger, &self.reservations);
        let approval = match kind {
            LockKind::Borrow => risk.check_lock_borrow(user, asset, amount)?,
            LockKind::Withdraw => risk.check_lock_withdraw(user, asset, amount)?,
        };
        if !approval.covers(kind, user, asset, amount) {
            return Err(HubError::InvalidRiskManager {
                reason: format!("approval does not cover lock {intent_id}"),
            });
        }

        let expiry = ctx
            .now
            .saturating_add(self.lock_ttl_secs)
            .min(intent.deadline);
        let lock = Lock {
            intent_id,
            terms: LockTerms {
                kind,
                user,
                asset,
                amount,
                relayer,
            },
            created_at: ctx.now,
            expiry,
            status: LockStatus::Active,
        };
        self.reservations.reserve(kind, user, asset, amount)?;
        self.locks.insert(intent_id, lock.clone());
        self.active.insert(intent_id);

        let reserved_liquidity = self.reservations.liquidity(asset);
        tracing::info!(
            intent = %intent_id.short(),
            %kind,
            %user,
            %asset,
            amount,
            %relayer,
            expiry,
            reserved_liquidity,
            "lock created"
        );
        ledger.emit(HubEvent::LockCreated {
            intent_id,
            kind,
            user,
            asset,
            amount,
            relayer,
            expiry,
            reserved_liquidity,
        });
        Ok(lock)
    }

    /// Release an expired lock. Anyone may call this once `now ≥ expiry`.
    pub fn cancel_expired_lock(&mut self, ledger: &mut Ledger, intent_id: IntentId, now: u64) -> Result<()> {
        let lock = self
            .locks
            .get_mut(&intent_id)
            .ok_or(HubError::LockNotFound(intent_id))?;
        if !lock.is_active() {
            return Err(HubError::LockNotActive {
                intent_id,
                status: lock.status,
            });
        }
        if now < lock.expiry {
            return Err(HubError::LockNotExpired {
                intent_id,
                expiry: lock.expiry,
                now,
            });
        }
        lock.mark_cancelled()?;
        let terms = lock.terms;
        self.active.remove(&intent_id);
        self.reservations
            .release(terms.kind, terms.user, terms.asset, terms.amount)?;

        let reserved_liquidity = self.reservations.liquidity(terms.asset);
        tracing::info!(intent = %intent_id.short(), reserved_liquidity, "lock cancelled");
        ledger.emit(HubEvent::LockCancelled {
            intent_id,
            reserved_liquidity,
        });
        Ok(())
    }

    /// Consume a live lock whose terms match `expected` exactly.
    /// Settlement-only.
    pub fn consume_lock(
        &mut self,
        cap: &SettlementCap,
        ledger: &mut Ledger,
        intent_id: IntentId,
        expected: &LockTerms,
        now: u64,
    ) -> Result<Lock> {
        if cap.ledger_id() != self.ledger_id {
            return Err(HubError::InvalidSettlement {
                reason: format!("capability does not open lock manager of ledger {}", self.ledger_id),
            });
        }
        ledger.verify_cap(cap)?;

        let lock = self.live_lock(intent_id, now)?;
        lock.terms.check(expected, "lock")?;
        let terms = lock.terms;

        let lock = self
            .locks
            .get_mut(&intent_id)
            .ok_or(HubError::LockNotFound(intent_id))?;
        lock.mark_consumed()?;
        let consumed = lock.clone();
        self.active.remove(&intent_id);
        self.reservations
            .release(terms.kind, terms.user, terms.asset, terms.amount)?;

        let reserved_liquidity = self.reservations.liquidity(terms.asset);
        tracing::debug!(intent = %intent_id.short(), reserved_liquidity, "lock consumed");
        ledger.emit(HubEvent::LockConsumed {
            intent_id,
            reserved_liquidity,
        });
        Ok(consumed)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The lock for `intent_id`, required ACTIVE and unexpired.
    pub fn live_lock(&self, intent_id: IntentId, now: u64) -> Result<&Lock> {
        let lock = self
            .locks
            .get(&intent_id)
            .ok_or(HubError::LockNotFound(intent_id))?;
        if !lock.is_active() {
            return Err(HubError::LockNotActive {
                intent_id,
                status: lock.status,
            });
        }
        if !lock.is_live(now) {
            return Err(HubError::LockExpired {
                intent_id,
                expiry: lock.expiry,
                now,
            });
        }
        Ok(lock)
    }

    /// The lock for `intent_id`, in any status.
    #[must_use]
    pub fn get(&self, intent_id: IntentId) -> Option<&Lock> {
        self.locks.get(&intent_id)
    }

    /// Status of `intent_id`; `NONE` if it was never locked.
    #[must_use]
    pub fn status(&self, intent_id: IntentId) -> LockStatus {
        self.locks
            .get(&intent_id)
            .map_or(LockStatus::None, |lock| lock.status)
    }

    /// ACTIVE locks in intent-id order.
    pub fn active_locks(&self) -> impl Iterator<Item = &Lock> {
        self.active.iter().filter_map(|id| self.locks.get(id))
    }

    /// Aggregates held by ACTIVE locks.
    #[must_use]
    pub fn reservations(&self) -> &Reservations {
        &self.reservations
    }

    /// Intent nonces consumed by locking.
    #[must_use]
    pub fn nonces(&self) -> &NonceRegistry {
        &self.nonces
    }

    /// Upper bound on a lock's lifetime.
    #[must_use]
    pub fn lock_ttl_secs(&self) -> u64 {
        self.lock_ttl_secs
    }

    /// Recompute the reservation aggregates from ACTIVE locks and compare.
    pub fn verify_reservations(&self) -> Result<()> {
        let mut expected = Reservations::new();
        for lock in self.active_locks() {
            if !lock.is_active() {
                return Err(HubError::ConservationViolation {
                    reason: format!("lock {} indexed as active is {}", lock.intent_id.short(), lock.status),
                });
            }
            let t = &lock.terms;
            expected.reserve(t.kind, t.user, t.asset, t.amount)?;
        }
        if expected != self.reservations {
            return Err(HubError::ConservationViolation {
                reason: "reservations diverge from active locks".into(),
            });
        }
        Ok(())
    }
}
