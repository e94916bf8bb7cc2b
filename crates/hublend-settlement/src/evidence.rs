//! Fill evidence book.
//!
//! A relayer that has fulfilled a locked intent on the spoke records what it
//! did here. Settlement later requires the evidence to match the batch's
//! finalization action field for field, fee included, and consumes it once.

use std::collections::HashMap;

use hublend_ledger::Ledger;
use hublend_types::{Address, FillEvidence, HubError, HubEvent, IntentId, LockTerms, Result};

use crate::{lock_manager::LockManager, verifier::FillAttestationVerifier};

/// Recorded fill evidence, at most one per intent.
#[derive(Debug, Clone)]
pub struct FillEvidenceBook {
    allow_self_attested: bool,
    records: HashMap<IntentId, FillEvidence>,
}

impl FillEvidenceBook {
    /// An empty book; `allow_self_attested` gates [`FillEvidenceBook::record_self_attested`].
    #[must_use]
    pub fn new(allow_self_attested: bool) -> Self {
        Self {
            allow_self_attested,
            records: HashMap::new(),
        }
    }

    /// Record evidence on the relayer's own word.
    ///
    /// # Errors
    /// `SelfAttestedFillsDisabled` when the path is switched off, and
    /// `RelayerMismatch` unless `caller` is the relayer the evidence binds.
    pub fn record_self_attested(
        &mut self,
        ledger: &mut Ledger,
        locks: &LockManager,
        caller: Address,
        evidence: FillEvidence,
        now: u64,
    ) -> Result<()> {
        if !self.allow_self_attested {
            return Err(HubError::SelfAttestedFillsDisabled);
        }
        if caller != evidence.terms.relayer {
            return Err(HubError::RelayerMismatch {
                caller,
                relayer: evidence.terms.relayer,
            });
        }
        self.record(ledger, locks, evidence, false, now)
    }

    /// Record evidence carrying a spoke-side attestation.
    pub fn record_verified(
        &mut self,
        ledger: &mut Ledger,
        locks: &LockManager,
        verifier: &dyn FillAttestationVerifier,
        evidence: FillEvidence,
        attestation: &[u8],
        now: u64,
    ) -> Result<()> {
        if !verifier.verify(&evidence, attestation) {
            return Err(HubError::InvalidFillAttestation);
        }
        self.record(ledger, locks, evidence, true, now)
    }

    fn record(
        &mut self,
        ledger: &mut Ledger,
        locks: &LockManager,
        mut evidence: FillEvidence,
        verified: bool,
        now: u64,
    ) -> Result<()> {
        let intent_id = evidence.intent_id;
        if self.records.contains_key(&intent_id) {
            return Err(HubError::FillEvidenceExists(intent_id));
        }
        let lock = locks.live_lock(intent_id, now)?;
        evidence.terms.check(&lock.terms, "fill evidence")?;
        if evidence.fee > evidence.terms.amount {
            return Err(HubError::InvalidFee {
                fee: evidence.fee,
                amount: evidence.terms.amount,
            });
        }

        evidence.consumed = false;
        let (relayer, amount, fee) = (evidence.terms.relayer, evidence.terms.amount, evidence.fee);
        self.records.insert(intent_id, evidence);

        tracing::info!(intent = %intent_id.short(), %relayer, amount, fee, verified, "fill recorded");
        ledger.emit(HubEvent::FillRecorded {
            intent_id,
            relayer,
            amount,
            fee,
            verified,
        });
        Ok(())
    }

    /// Consume the evidence for `intent_id`, which must match `expected`
    /// and `fee` exactly.
    pub fn consume(&mut self, intent_id: IntentId, expected: &LockTerms, fee: u128) -> Result<()> {
        let evidence = self
            .records
            .get_mut(&intent_id)
            .ok_or(HubError::FillEvidenceNotFound(intent_id))?;
        if evidence.consumed {
            return Err(HubError::FillEvidenceConsumed(intent_id));
        }
        evidence.check(expected, fee)?;
        evidence.consumed = true;
        Ok(())
    }

    /// Evidence recorded for `intent_id`, if any.
    #[must_use]
    pub fn get(&self, intent_id: IntentId) -> Option<&FillEvidence> {
        self.records.get(&intent_id)
    }

    /// Whether relayers may record their own fills.
    #[must_use]
    pub fn allows_self_attested(&self) -> bool {
        self.allow_self_attested
    }

    /// Number of intents with recorded evidence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
