//! Identifiers used throughout HubLend.
//!
//! Accounts and assets are 20-byte EVM-style [`Address`]es. Intents are keyed
//! by a 32-byte digest computed by the intent authentication component;
//! deposits and batches carry 256-bit integers assigned off-core.

use std::fmt;

pub use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Interpret an address as a big-endian 256-bit integer.
#[must_use]
pub fn address_word(address: Address) -> U256 {
    U256::from_be_slice(address.as_slice())
}

// ---------------------------------------------------------------------------
// DomainId
// ---------------------------------------------------------------------------

/// Identifier of a ledger execution context (the hub or a spoke).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DomainId(pub u64);

impl DomainId {
    #[must_use]
    pub fn word(self) -> U256 {
        U256::from(self.0)
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "domain:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// IntentId
// ---------------------------------------------------------------------------

/// Stable identifier of a signed intent. One lock exists per intent, ever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct IntentId(pub B256);

impl IntentId {
    #[must_use]
    pub fn word(self) -> U256 {
        U256::from_be_bytes(self.0.0)
    }

    /// First four bytes as hex, for log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "intent:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// DepositId
// ---------------------------------------------------------------------------

/// Identifier of an inbound transfer, unique per origin domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DepositId(pub U256);

impl DepositId {
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl fmt::Display for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deposit:{}", self.0)
    }
}

/// Custody and replay-guard key for a deposit.
pub type DepositKey = (DomainId, DepositId);

// ---------------------------------------------------------------------------
// BatchId
// ---------------------------------------------------------------------------

/// Identifier of a settlement batch. Replay-guarded forever once executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BatchId(pub U256);

impl BatchId {
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch:{}", self.0)
    }
}

/// Deterministic test address `0x0000…00NN`. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[must_use]
pub fn test_address(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    Address::from(bytes)
}

/// Random address for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[must_use]
pub fn random_address() -> Address {
    Address::from(rand::random::<[u8; 20]>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_word_is_big_endian() {
        let addr = test_address(7);
        assert_eq!(address_word(addr), U256::from(7u64));
    }

    #[test]
    fn intent_id_word_roundtrips_bytes() {
        let mut bytes = [0u8; 32];
        bytes[31] = 0x2a;
        let id = IntentId(B256::from(bytes));
        assert_eq!(id.word(), U256::from(42u64));
    }

    #[test]
    fn display_prefixes() {
        assert_eq!(format!("{}", DomainId(8453)), "domain:8453");
        assert_eq!(format!("{}", BatchId::from_u64(3)), "batch:3");
        assert_eq!(format!("{}", DepositId::from_u64(9)), "deposit:9");
        let id = IntentId(B256::repeat_byte(0xab));
        assert_eq!(format!("{id}"), "intent:abababababababab");
        assert_eq!(id.short(), "abababab");
    }

    #[test]
    fn random_addresses_differ() {
        assert_ne!(random_address(), random_address());
    }

    #[test]
    fn serde_roundtrips() {
        let id = BatchId::from_u64(77);
        let json = serde_json::to_string(&id).unwrap();
        let back: BatchId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
