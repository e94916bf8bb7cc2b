//! External verification capabilities.
//!
//! The hub never generates proofs or attestations; it only asks a verifier
//! for a yes/no answer over exactly the data it has already recomputed.
//!
//! - [`ProofVerifier`] gates settlement batches on the four public inputs.
//! - [`FillAttestationVerifier`] gates the verified fill-evidence path.

use alloy_primitives::{B256, U256};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hublend_types::{FillEvidence, constants::PUBLIC_INPUT_COUNT};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Public inputs bound into a settlement proof.
pub type PublicInputs = [U256; PUBLIC_INPUT_COUNT];

/// Proof bytes, tagged by proving system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "system", rename_all = "snake_case")]
pub enum SettlementProof {
    /// Development proof: a SHA-256 digest over the public inputs.
    Dev { digest: B256 },
    /// Groth16 proof bytes for an external backend.
    Groth16 { bytes: Vec<u8> },
}

impl SettlementProof {
    /// Build the development proof for `inputs`.
    #[must_use]
    pub fn dev(inputs: &PublicInputs) -> Self {
        Self::Dev {
            digest: dev_digest(inputs),
        }
    }

    /// Proof system name, for logs.
    #[must_use]
    pub fn system(&self) -> &'static str {
        match self {
            Self::Dev { .. } => "dev",
            Self::Groth16 { .. } => "groth16",
        }
    }
}

/// `SHA-256("hublend:dev-proof:v1:" || input_0 || … || input_3)`, inputs as
/// 32-byte big-endian words.
#[must_use]
pub fn dev_digest(inputs: &PublicInputs) -> B256 {
    let mut hasher = Sha256::new();
    hasher.update(b"hublend:dev-proof:v1:");
    for input in inputs {
        hasher.update(input.to_be_bytes::<32>());
    }
    B256::from_slice(&hasher.finalize())
}

/// Settlement proof verifier.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, proof: &SettlementProof, public_inputs: &PublicInputs) -> bool;
}

/// Accepts only [`SettlementProof::Dev`] proofs whose digest matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevProofVerifier;

impl ProofVerifier for DevProofVerifier {
    fn verify(&self, proof: &SettlementProof, public_inputs: &PublicInputs) -> bool {
        match proof {
            SettlementProof::Dev { digest } => *digest == dev_digest(public_inputs),
            SettlementProof::Groth16 { .. } => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Fill attestations
// ---------------------------------------------------------------------------

/// Verifier for spoke-side fill attestations.
pub trait FillAttestationVerifier: Send + Sync {
    fn verify(&self, evidence: &FillEvidence, attestation: &[u8]) -> bool;
}

/// Fill attestations signed by a single ed25519 spoke attester key.
#[derive(Debug, Clone)]
pub struct Ed25519FillAttester {
    key: VerifyingKey,
}

impl Ed25519FillAttester {
    /// Accept attestations signed by `key`.
    #[must_use]
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Produce an attestation over `evidence` (spoke side; used by tooling
    /// and tests).
    #[must_use]
    pub fn attest(signing_key: &SigningKey, evidence: &FillEvidence) -> Vec<u8> {
        let signature: Signature = signing_key.sign(&evidence.attestation_payload());
        signature.to_bytes().to_vec()
    }
}

impl FillAttestationVerifier for Ed25519FillAttester {
    fn verify(&self, evidence: &FillEvidence, attestation: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(attestation) else {
            return false;
        };
        self.key
            .verify(&evidence.attestation_payload(), &signature)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use hublend_types::{Lock, LockKind};
    use rand::rngs::OsRng;

    use super::*;

    fn inputs() -> PublicInputs {
        [U256::from(1u8), U256::from(2u8), U256::from(3u8), U256::from(4u8)]
    }

    #[test]
    fn dev_proof_accepted_for_its_inputs_only() {
        let proof = SettlementProof::dev(&inputs());
        assert!(DevProofVerifier.verify(&proof, &inputs()));
        let mut other = inputs();
        other[3] = U256::from(5u8);
        assert!(!DevProofVerifier.verify(&proof, &other));
    }

    #[test]
    fn dev_verifier_rejects_groth16() {
        let proof = SettlementProof::Groth16 { bytes: vec![1, 2, 3] };
        assert!(!DevProofVerifier.verify(&proof, &inputs()));
        assert_eq!(proof.system(), "groth16");
    }

    #[test]
    fn proof_serializes_with_system_tag() {
        let json = serde_json::to_value(SettlementProof::dev(&inputs())).unwrap();
        assert_eq!(json["system"], "dev");
    }

    #[test]
    fn fill_attestation_round_trip() {
        let key = SigningKey::generate(&mut OsRng);
        let attester = Ed25519FillAttester::new(key.verifying_key());
        let lock = Lock::dummy(LockKind::Borrow, 100, 10);
        let evidence = FillEvidence::new(lock.intent_id, lock.terms, 2);
        let sig = Ed25519FillAttester::attest(&key, &evidence);
        assert!(attester.verify(&evidence, &sig));

        let mut tampered = evidence.clone();
        tampered.fee = 3;
        assert!(!attester.verify(&tampered, &sig));
        assert!(!attester.verify(&evidence, &sig[..10]));
    }
}
