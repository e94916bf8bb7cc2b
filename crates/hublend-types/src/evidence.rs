//! Fill evidence: a recorded claim that a locked intent was fulfilled on
//! the spoke domain.
//!
//! Evidence is recorded once per intent while the lock is live and consumed
//! exactly once, by the settlement batch that finalizes the intent.

use serde::{Deserialize, Serialize};

use crate::{HubError, IntentId, LockTerms, Result};

/// Fulfillment claim for one intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillEvidence {
    pub intent_id: IntentId,
    /// Kind, user, asset, amount and relayer of the fill.
    pub terms: LockTerms,
    /// Fee the relayer kept out of the delivered amount.
    pub fee: u128,
    /// Flips to `true` once, at successful settlement.
    pub consumed: bool,
}

impl FillEvidence {
    /// Evidence that `intent_id` was filled under `terms` for `fee`.
    #[must_use]
    pub fn new(intent_id: IntentId, terms: LockTerms, fee: u128) -> Self {
        Self {
            intent_id,
            terms,
            fee,
            consumed: false,
        }
    }

    /// Canonical payload signed by a spoke fill attester.
    ///
    /// Format: `"hublend:fill:v1:" || intent_id || tag || user || asset || amount || fee || relayer`
    #[must_use]
    pub fn attestation_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(160);
        payload.extend_from_slice(b"hublend:fill:v1:");
        payload.extend_from_slice(self.intent_id.0.as_slice());
        payload.push(self.terms.kind.intent_kind().tag());
        payload.extend_from_slice(self.terms.user.as_slice());
        payload.extend_from_slice(self.terms.asset.as_slice());
        payload.extend_from_slice(&self.terms.amount.to_be_bytes());
        payload.extend_from_slice(&self.fee.to_be_bytes());
        payload.extend_from_slice(self.terms.relayer.as_slice());
        payload
    }

    /// Exact match against a settlement action's terms and fee.
    pub fn check(&self, expected: &LockTerms, fee: u128) -> Result<()> {
        self.terms.check(expected, "fill evidence")?;
        if self.fee != fee {
            return Err(HubError::FieldMismatch {
                context: "fill evidence",
                field: "fee",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Lock, LockKind};

    #[test]
    fn fee_mismatch_detected() {
        let lock = Lock::dummy(LockKind::Borrow, 100, 10);
        let evidence = FillEvidence::new(lock.intent_id, lock.terms, 3);
        assert!(evidence.check(&lock.terms, 3).is_ok());
        let err = evidence.check(&lock.terms, 4).unwrap_err();
        assert_eq!(
            err,
            HubError::FieldMismatch { context: "fill evidence", field: "fee" }
        );
    }

    #[test]
    fn payload_binds_amount() {
        let lock = Lock::dummy(LockKind::Withdraw, 100, 10);
        let a = FillEvidence::new(lock.intent_id, lock.terms, 1);
        let mut b = a.clone();
        b.terms.amount = 101;
        assert_ne!(a.attestation_payload(), b.attestation_payload());
    }
}
