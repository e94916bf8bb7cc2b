//! Custody deposits: attested inbound transfers awaiting settlement.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Address, DepositId, DepositKey, DomainId, HubError, Result};

/// What an inbound transfer pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepositKind {
    Supply,
    Repay,
}

impl fmt::Display for DepositKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supply => write!(f, "SUPPLY"),
            Self::Repay => write!(f, "REPAY"),
        }
    }
}

/// The fields a deposit binds; compared exactly on consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositTerms {
    pub kind: DepositKind,
    pub user: Address,
    pub asset: Address,
    pub amount: u128,
}

impl DepositTerms {
    /// Field-by-field comparison; the first differing field is reported.
    pub fn check(&self, expected: &Self) -> Result<()> {
        let field = if self.kind != expected.kind {
            "kind"
        } else if self.user != expected.user {
            "user"
        } else if self.asset != expected.asset {
            "asset"
        } else if self.amount != expected.amount {
            "amount"
        } else {
            return Ok(());
        };
        Err(HubError::FieldMismatch {
            context: "custody deposit",
            field,
        })
    }
}

/// A validated inbound transfer supplied by the deposit-attestation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositAttestation {
    pub origin_domain_id: DomainId,
    pub deposit_id: DepositId,
    pub terms: DepositTerms,
}

impl DepositAttestation {
    /// Replay key: origin domain plus deposit id.
    #[must_use]
    pub fn key(&self) -> DepositKey {
        (self.origin_domain_id, self.deposit_id)
    }
}

/// A registered custody deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyDeposit {
    pub origin_domain_id: DomainId,
    pub deposit_id: DepositId,
    pub terms: DepositTerms,
    pub consumed: bool,
}

impl From<DepositAttestation> for CustodyDeposit {
    fn from(att: DepositAttestation) -> Self {
        Self {
            origin_domain_id: att.origin_domain_id,
            deposit_id: att.deposit_id,
            terms: att.terms,
            consumed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_address;

    #[test]
    fn terms_mismatch_names_field() {
        let terms = DepositTerms {
            kind: DepositKind::Supply,
            user: test_address(1),
            asset: test_address(2),
            amount: 100,
        };
        assert!(terms.check(&terms).is_ok());
        let other = DepositTerms {
            kind: DepositKind::Repay,
            ..terms
        };
        assert_eq!(
            terms.check(&other).unwrap_err(),
            HubError::FieldMismatch { context: "custody deposit", field: "kind" }
        );
    }

    #[test]
    fn attestation_becomes_unconsumed_deposit() {
        let att = DepositAttestation {
            origin_domain_id: DomainId(10),
            deposit_id: DepositId::from_u64(1),
            terms: DepositTerms {
                kind: DepositKind::Repay,
                user: test_address(1),
                asset: test_address(2),
                amount: 5,
            },
        };
        let deposit = CustodyDeposit::from(att);
        assert!(!deposit.consumed);
        assert_eq!(att.key(), (DomainId(10), DepositId::from_u64(1)));
    }
}
