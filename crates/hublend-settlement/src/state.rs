//! Everything a hub call may mutate, in one cloneable value.

use hublend_ledger::{Ledger, Registry, SettlementCap, verify_conservation};
use hublend_types::{EngineConfig, Result};

use crate::{
    custody::CustodyLedger, evidence::FillEvidenceBook, idempotency::ReplayGuards,
    lock_manager::LockManager,
};

/// Hub state. A mutating call works on a clone and the hub swaps it in only
/// if the call succeeded.
#[derive(Debug, Clone)]
pub struct HubState {
    pub registry: Registry,
    pub ledger: Ledger,
    pub locks: LockManager,
    pub evidence: FillEvidenceBook,
    pub custody: CustodyLedger,
    pub guards: ReplayGuards,
}

impl HubState {
    /// Empty state wired from `config`. The returned capability is the only
    /// one that opens the ledger's settlement-only entry points.
    pub fn new(config: &EngineConfig) -> Result<(Self, SettlementCap)> {
        let registry = Registry::new(config.risk_admin)?;
        let (ledger, cap) = Ledger::new(config.settlement_operator)?;
        let locks = LockManager::new(&ledger, config.lock_ttl_secs);
        let custody = CustodyLedger::new(&ledger, config.deposit_attester)?;
        let state = Self {
            registry,
            ledger,
            locks,
            evidence: FillEvidenceBook::new(config.allow_self_attested_fills),
            custody,
            guards: ReplayGuards::new(),
        };
        Ok((state, cap))
    }

    /// Share and reservation bookkeeping checks run before every commit.
    pub fn verify_invariants(&self) -> Result<()> {
        for market in self.ledger.markets() {
            verify_conservation(&self.ledger, market.asset)?;
        }
        self.locks.verify_reservations()
    }
}
