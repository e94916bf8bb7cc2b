//! # Intents: signed user requests
//!
//! An [`Intent`] asks the protocol to move value across domains on the user's
//! behalf. BORROW and WITHDRAW intents are fulfilled on the spoke by a relayer
//! and must be locked on the hub first; SUPPLY and REPAY intents arrive as
//! custody deposits instead.
//!
//! ## Identity
//!
//! Users sign with ed25519. The user's hub address is the last 20 bytes of
//! `SHA-256(public_key)`, so a signature binds the intent to exactly one
//! account. The [`IntentId`] is `SHA-256` over the canonical payload, which
//! makes it stable across relayers and resubmissions.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Address, B256, DomainId, IntentId};

/// What an intent asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    Supply,
    Borrow,
    Repay,
    Withdraw,
}

impl IntentKind {
    /// Tag folded into commitments and signing payloads.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Supply => 1,
            Self::Repay => 2,
            Self::Borrow => 3,
            Self::Withdraw => 4,
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supply => write!(f, "SUPPLY"),
            Self::Borrow => write!(f, "BORROW"),
            Self::Repay => write!(f, "REPAY"),
            Self::Withdraw => write!(f, "WITHDRAW"),
        }
    }
}

/// A user request to move value between the hub and a spoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    /// Hub account of the user.
    pub user: Address,
    /// Spoke domain where the transfer is fulfilled.
    pub spoke_domain_id: DomainId,
    /// Token address on the spoke domain.
    pub token: Address,
    pub amount: u128,
    /// Receiver of the fulfilled transfer on the spoke.
    pub recipient: Address,
    /// Unix seconds after which the intent is void.
    pub deadline: u64,
    /// Replay-preventing nonce, unique per user.
    pub nonce: u64,
}

impl Intent {
    /// Canonical signing payload.
    ///
    /// Format: `"hublend:intent:v1:" || tag || user || domain || token || amount || recipient || deadline || nonce`
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(128);
        payload.extend_from_slice(b"hublend:intent:v1:");
        payload.push(self.kind.tag());
        payload.extend_from_slice(self.user.as_slice());
        payload.extend_from_slice(&self.spoke_domain_id.0.to_be_bytes());
        payload.extend_from_slice(self.token.as_slice());
        payload.extend_from_slice(&self.amount.to_be_bytes());
        payload.extend_from_slice(self.recipient.as_slice());
        payload.extend_from_slice(&self.deadline.to_be_bytes());
        payload.extend_from_slice(&self.nonce.to_be_bytes());
        payload
    }

    /// Deterministic identifier of this intent.
    #[must_use]
    pub fn id(&self) -> IntentId {
        let digest = Sha256::digest(self.signing_payload());
        IntentId(B256::from_slice(&digest))
    }
}

/// Hub address controlled by an ed25519 key.
#[must_use]
pub fn address_from_key(key: &VerifyingKey) -> Address {
    let digest = Sha256::digest(key.as_bytes());
    Address::from_slice(&digest[12..])
}

/// An intent together with the user's signature over its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedIntent {
    pub intent: Intent,
    /// Raw ed25519 public key of the signer.
    pub signer: [u8; 32],
    /// Raw ed25519 signature over [`Intent::signing_payload`].
    pub signature: Vec<u8>,
}

impl SignedIntent {
    /// Sign an intent with the user's key.
    #[must_use]
    pub fn sign(intent: Intent, key: &SigningKey) -> Self {
        let signature: Signature = key.sign(&intent.signing_payload());
        Self {
            intent,
            signer: key.verifying_key().to_bytes(),
            signature: signature.to_bytes().to_vec(),
        }
    }
}
