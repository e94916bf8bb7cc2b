//! # hublend-types
//!
//! Shared types, errors, and configuration for the **HubLend** hub-side
//! accounting and settlement engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`DomainId`], [`IntentId`], [`DepositId`], [`BatchId`]
//! - **Intent model**: [`Intent`], [`IntentKind`], [`SignedIntent`]
//! - **Lock model**: [`Lock`], [`LockKind`], [`LockStatus`], [`LockTerms`]
//! - **Fill evidence**: [`FillEvidence`]
//! - **Custody model**: [`CustodyDeposit`], [`DepositKind`], [`DepositAttestation`]
//! - **Batch model**: [`SettlementBatch`], [`CreditAction`], [`FinalizeAction`]
//! - **Configuration**: [`EngineConfig`], [`AssetConfig`], [`RiskParams`], [`RateModelParams`]
//! - **Events**: [`HubEvent`]
//! - **Errors**: [`HubError`] with `HL_ERR_` prefix codes
//! - **Math**: fixed-point helpers in [`math`]
//! - **Time**: [`Clock`], [`SystemClock`], [`ManualClock`]
//! - **Constants**: system-wide limits and scales

pub mod batch;
pub mod clock;
pub mod config;
pub mod constants;
pub mod custody;
pub mod error;
pub mod events;
pub mod evidence;
pub mod ids;
pub mod intent;
pub mod lock;
pub mod math;
pub mod risk;

// Re-export all primary types at crate root for ergonomic imports:
//   use hublend_types::{Lock, LockStatus, SettlementBatch, ...};

pub use batch::*;
pub use clock::*;
pub use config::*;
pub use custody::*;
pub use error::*;
pub use events::*;
pub use evidence::*;
pub use ids::*;
pub use intent::*;
pub use lock::*;
pub use risk::*;

// Constants and math helpers are accessed via `hublend_types::constants::FOO`
// and `hublend_types::math::mul_div` (not re-exported to avoid name collisions).
