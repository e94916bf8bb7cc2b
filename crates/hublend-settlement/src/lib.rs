//! # hublend-settlement
//!
//! **Settlement plane**: intent locks, fill evidence, custody deposits and
//! proof-gated batch settlement on top of the accounting ledger.
//!
//! ## Architecture
//!
//! A borrow or withdraw on a spoke domain goes through four steps:
//! 1. **Lock**: a signed intent reserves hub liquidity and risk headroom
//! 2. **Fill**: the relayer records evidence that it paid the user on the spoke
//! 3. **Batch**: the spoke commits to a batch of actions and proves it
//! 4. **Settle**: the hub checks the commitment and proof, then applies every
//!    credit and finalization atomically
//!
//! Supply and repay deposits take the custody path instead: an attester
//! registers the deposit, and settlement consumes it exactly once.
//!
//! ```text
//! Hub ─► SettlementEngine ─► LockManager ─► RiskEngine ─► Ledger
//!                        └─► CustodyLedger / FillEvidenceBook / ReplayGuards
//! ```

pub mod commitment;
pub mod context;
pub mod custody;
pub mod engine;
pub mod evidence;
pub mod hub;
pub mod idempotency;
pub mod intent_auth;
pub mod lock_manager;
pub mod state;
pub mod verifier;

pub use context::Context;
pub use custody::CustodyLedger;
pub use engine::{SettlementEngine, SettlementReceipt};
pub use evidence::FillEvidenceBook;
pub use hub::Hub;
pub use idempotency::ReplayGuards;
pub use intent_auth::{Ed25519IntentAuthenticator, IntentAuthenticator, NonceRegistry};
pub use lock_manager::LockManager;
pub use state::HubState;
pub use verifier::{
    DevProofVerifier, Ed25519FillAttester, FillAttestationVerifier, ProofVerifier,
    PublicInputs, SettlementProof,
};

#[cfg(test)]
pub(crate) mod tests {
    use hublend_types::{
        AssetConfig, CompanionToken, DomainId, RateModelParams, RiskParams, test_address,
    };

    /// A 6-decimal stablecoin mirrored on domain 10 as `test_address(100 + n)`.
    pub(crate) fn asset_config(n: u8) -> AssetConfig {
        AssetConfig {
            asset: test_address(n),
            symbol: format!("TKN{n}"),
            decimals: 6,
            companions: vec![CompanionToken {
                domain_id: DomainId(10),
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
}
