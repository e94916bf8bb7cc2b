//! Error types for the HubLend engine.
//!
//! All errors use the `HL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by failure class:
//! - 1xx: Validation (malformed input, unsupported asset, oversized batch)
//! - 2xx: State (not found, already exists, wrong lock status, replays)
//! - 3xx: Authorization (wrong caller, wrong capability, bad signature)
//! - 4xx: Consistency (field mismatch, commitment mismatch)
//! - 5xx: Capacity (caps, liquidity, health factor)
//! - 6xx: External (oracle, proof verifier, attestations)
//! - 9xx: Internal
//!
//! Every error is a synchronous abort: the operation that raised it leaves no
//! trace in the hub state.

use std::fmt;

use thiserror::Error;

use crate::{Address, BatchId, DepositId, DomainId, IntentId, IntentKind, LockStatus, U256};

/// Central error enum for all HubLend operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// Amounts must be strictly positive.
    #[error("HL_ERR_100: Amount must be greater than zero")]
    ZeroAmount,

    /// A required address was the zero address.
    #[error("HL_ERR_101: Zero address for {what}")]
    ZeroAddress { what: &'static str },

    /// The asset is not registered in the registry.
    #[error("HL_ERR_102: Unsupported asset: {0}")]
    UnsupportedAsset(Address),

    /// No hub asset is mapped to this companion-domain token.
    #[error("HL_ERR_103: Unsupported token {token} on {domain}")]
    UnsupportedToken { domain: DomainId, token: Address },

    /// Only BORROW and WITHDRAW intents can be locked.
    #[error("HL_ERR_104: Intent kind {0} cannot be locked")]
    UnsupportedIntentKind(IntentKind),

    /// The batch carries more actions than the settlement cap.
    #[error("HL_ERR_105: Batch too large: {count} actions, max {max}")]
    BatchTooLarge { count: usize, max: usize },

    /// Configuration failed validation.
    #[error("HL_ERR_106: Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Risk parameters violate their ordering constraints.
    #[error("HL_ERR_107: Invalid risk parameters: {reason}")]
    InvalidRiskParams { reason: String },

    /// The batch targets a different hub domain.
    #[error("HL_ERR_108: Wrong hub domain: expected {expected}, got {actual}")]
    WrongHubDomain { expected: DomainId, actual: DomainId },

    /// The counterparty domain is not configured.
    #[error("HL_ERR_109: Unknown domain: {0}")]
    UnknownDomain(DomainId),

    /// The intent deadline has passed.
    #[error("HL_ERR_110: Intent expired: deadline {deadline}, now {now}")]
    IntentExpired { deadline: u64, now: u64 },

    /// The relayer fee exceeds the filled amount.
    #[error("HL_ERR_111: Fee {fee} exceeds amount {amount}")]
    InvalidFee { fee: u128, amount: u128 },

    /// The asset is already registered.
    #[error("HL_ERR_112: Asset already registered: {0}")]
    AssetAlreadyRegistered(Address),

    /// The asset is registered but disabled.
    #[error("HL_ERR_113: Asset disabled: {0}")]
    AssetDisabled(Address),

    // =================================================================
    // State Errors (2xx)
    // =================================================================
    /// No lock was ever created for this intent.
    #[error("HL_ERR_200: Lock not found: {0}")]
    LockNotFound(IntentId),

    /// A lock already exists for this intent (in any status).
    #[error("HL_ERR_201: Lock already exists: {0}")]
    LockAlreadyExists(IntentId),

    /// The lock is not ACTIVE.
    #[error("HL_ERR_202: Lock {intent_id} is {status}, not ACTIVE")]
    LockNotActive { intent_id: IntentId, status: LockStatus },

    /// The lock expired before it could be consumed.
    #[error("HL_ERR_203: Lock {intent_id} expired at {expiry}, now {now}")]
    LockExpired { intent_id: IntentId, expiry: u64, now: u64 },

    /// The lock cannot be cancelled before its expiry.
    #[error("HL_ERR_204: Lock {intent_id} not expired until {expiry}, now {now}")]
    LockNotExpired { intent_id: IntentId, expiry: u64, now: u64 },

    /// No custody deposit under this key.
    #[error("HL_ERR_205: Deposit not found: {deposit_id} from {domain}")]
    DepositNotFound { domain: DomainId, deposit_id: DepositId },

    /// A custody deposit already exists under this key.
    #[error("HL_ERR_206: Deposit already registered: {deposit_id} from {domain}")]
    DepositAlreadyExists { domain: DomainId, deposit_id: DepositId },

    /// The custody deposit was already consumed.
    #[error("HL_ERR_207: Deposit already consumed: {deposit_id} from {domain}")]
    DepositAlreadyConsumed { domain: DomainId, deposit_id: DepositId },

    /// The batch was already executed (replay guard).
    #[error("HL_ERR_208: Batch already executed: {0}")]
    BatchAlreadyExecuted(BatchId),

    /// The deposit was already settled by an earlier batch (replay guard).
    #[error("HL_ERR_209: Deposit already settled: {deposit_id} from {domain}")]
    DepositAlreadySettled { domain: DomainId, deposit_id: DepositId },

    /// The intent was already settled by an earlier batch (replay guard).
    #[error("HL_ERR_210: Intent already settled: {0}")]
    IntentAlreadySettled(IntentId),

    /// No fill evidence was recorded for this intent.
    #[error("HL_ERR_211: Fill evidence not found: {0}")]
    FillEvidenceNotFound(IntentId),

    /// Fill evidence was already recorded for this intent.
    #[error("HL_ERR_212: Fill evidence already recorded: {0}")]
    FillEvidenceExists(IntentId),

    /// Fill evidence was already consumed by settlement.
    #[error("HL_ERR_213: Fill evidence already consumed: {0}")]
    FillEvidenceConsumed(IntentId),

    /// The `(user, nonce)` pair was already used by an accepted intent.
    #[error("HL_ERR_214: Nonce {nonce} already used by {user}")]
    NonceAlreadyUsed { user: Address, nonce: u64 },

    /// The borrower is healthy and cannot be liquidated.
    #[error("HL_ERR_215: Position not liquidatable: {borrower} health factor {health_factor}")]
    NotLiquidatable { borrower: Address, health_factor: u128 },

    /// Hub wallet balance too low.
    #[error("HL_ERR_216: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    /// Seized collateral would exceed the borrower's supply position.
    #[error("HL_ERR_217: Insufficient collateral: seize {seize}, have {available}")]
    InsufficientCollateral { seize: u128, available: u128 },

    /// The borrower has no debt in the requested asset.
    #[error("HL_ERR_218: No outstanding debt in {0}")]
    NoDebt(Address),

    // =================================================================
    // Authorization Errors (3xx)
    // =================================================================
    /// The caller is not allowed to perform this action.
    #[error("HL_ERR_300: Unauthorized: {caller} cannot {action}")]
    Unauthorized { caller: Address, action: &'static str },

    /// Settlement wiring is missing or the capability belongs to another ledger.
    #[error("HL_ERR_301: Invalid settlement: {reason}")]
    InvalidSettlement { reason: String },

    /// The risk admin is not configured.
    #[error("HL_ERR_302: Invalid risk manager: {reason}")]
    InvalidRiskManager { reason: String },

    /// Self-attested evidence must come from the relayer it binds.
    #[error("HL_ERR_303: Caller {caller} is not relayer {relayer}")]
    RelayerMismatch { caller: Address, relayer: Address },

    /// The intent signature did not verify.
    #[error("HL_ERR_304: Intent signature verification failed")]
    InvalidSignature,

    /// The signing key does not belong to the intent's user.
    #[error("HL_ERR_305: Signer {signer} does not match intent user {user}")]
    SignerMismatch { signer: Address, user: Address },

    /// The self-attested fill path is disabled by configuration.
    #[error("HL_ERR_306: Self-attested fill evidence is disabled")]
    SelfAttestedFillsDisabled,

    // =================================================================
    // Consistency Errors (4xx)
    // =================================================================
    /// A recorded field disagrees with the expected value.
    #[error("HL_ERR_400: {context} mismatch on field {field}")]
    FieldMismatch { context: &'static str, field: &'static str },

    /// The recomputed actions root differs from the submitted one.
    #[error("HL_ERR_401: Actions root mismatch: expected {expected}, got {actual}")]
    ActionsRootMismatch { expected: U256, actual: U256 },

    /// Share bookkeeping no longer sums up. Critical safety alert.
    #[error("HL_ERR_402: Conservation violation: {reason}")]
    ConservationViolation { reason: String },

    // =================================================================
    // Capacity Errors (5xx)
    // =================================================================
    /// Supply or supply credit rejected by cap or configuration.
    #[error("HL_ERR_500: Supply not allowed for {asset}: {reason}")]
    SupplyNotAllowed { asset: Address, reason: String },

    /// Borrow rejected by cap or health factor.
    #[error("HL_ERR_501: Borrow not allowed for {asset}: {reason}")]
    BorrowNotAllowed { asset: Address, reason: String },

    /// Withdraw rejected by balance or health factor.
    #[error("HL_ERR_502: Withdraw not allowed for {asset}: {reason}")]
    WithdrawNotAllowed { asset: Address, reason: String },

    /// Unreserved pool liquidity is insufficient.
    #[error("HL_ERR_503: Insufficient liquidity in {asset}: requested {requested}, available {available}")]
    InsufficientLiquidity { asset: Address, requested: u128, available: u128 },

    // =================================================================
    // External Errors (6xx)
    // =================================================================
    /// The oracle price is older than the staleness window.
    #[error("HL_ERR_600: Stale price for {asset}: updated {updated_at}, now {now}")]
    StalePrice { asset: Address, updated_at: u64, now: u64 },

    /// The oracle returned no price or a non-positive price.
    #[error("HL_ERR_601: Invalid price for {asset}: {reason}")]
    InvalidPrice { asset: Address, reason: String },

    /// The oracle price lies outside the configured bounds.
    #[error("HL_ERR_602: Price {price} for {asset} outside [{min}, {max}]")]
    PriceOutOfBounds { asset: Address, price: u128, min: u128, max: u128 },

    /// The proof verifier rejected the settlement proof.
    #[error("HL_ERR_603: Settlement proof rejected")]
    InvalidProof,

    /// The fill attestation did not verify.
    #[error("HL_ERR_604: Fill attestation rejected")]
    InvalidFillAttestation,

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Fixed-point arithmetic overflowed.
    #[error("HL_ERR_900: Arithmetic overflow")]
    MathOverflow,

    /// Fixed-point division by zero.
    #[error("HL_ERR_901: Division by zero")]
    DivisionByZero,

    /// Unrecoverable internal error.
    #[error("HL_ERR_902: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("HL_ERR_903: Serialization error: {0}")]
    Serialization(String),

    /// I/O error (config file).
    #[error("HL_ERR_904: I/O error: {0}")]
    Io(String),
}

/// Failure class of a [`HubError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    State,
    Authorization,
    Consistency,
    Capacity,
    External,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::State => "state",
            Self::Authorization => "authorization",
            Self::Consistency => "consistency",
            Self::Capacity => "capacity",
            Self::External => "external",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl HubError {
    /// The failure class of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ZeroAmount
            | Self::ZeroAddress { .. }
            | Self::UnsupportedAsset(_)
            | Self::UnsupportedToken { .. }
            | Self::UnsupportedIntentKind(_)
            | Self::BatchTooLarge { .. }
            | Self::InvalidConfig(_)
            | Self::InvalidRiskParams { .. }
            | Self::WrongHubDomain { .. }
            | Self::UnknownDomain(_)
            | Self::IntentExpired { .. }
            | Self::InvalidFee { .. }
            | Self::AssetAlreadyRegistered(_)
            | Self::AssetDisabled(_) => ErrorCategory::Validation,

            Self::LockNotFound(_)
            | Self::LockAlreadyExists(_)
            | Self::LockNotActive { .. }
            | Self::LockExpired { .. }
            | Self::LockNotExpired { .. }
            | Self::DepositNotFound { .. }
            | Self::DepositAlreadyExists { .. }
            | Self::DepositAlreadyConsumed { .. }
            | Self::BatchAlreadyExecuted(_)
            | Self::DepositAlreadySettled { .. }
            | Self::IntentAlreadySettled(_)
            | Self::FillEvidenceNotFound(_)
            | Self::FillEvidenceExists(_)
            | Self::FillEvidenceConsumed(_)
            | Self::NonceAlreadyUsed { .. }
            | Self::NotLiquidatable { .. }
            | Self::InsufficientBalance { .. }
            | Self::InsufficientCollateral { .. }
            | Self::NoDebt(_) => ErrorCategory::State,

            Self::Unauthorized { .. }
            | Self::InvalidSettlement { .. }
            | Self::InvalidRiskManager { .. }
            | Self::RelayerMismatch { .. }
            | Self::InvalidSignature
            | Self::SignerMismatch { .. }
            | Self::SelfAttestedFillsDisabled => ErrorCategory::Authorization,

            Self::FieldMismatch { .. }
            | Self::ActionsRootMismatch { .. }
            | Self::ConservationViolation { .. } => ErrorCategory::Consistency,

            Self::SupplyNotAllowed { .. }
            | Self::BorrowNotAllowed { .. }
            | Self::WithdrawNotAllowed { .. }
            | Self::InsufficientLiquidity { .. } => ErrorCategory::Capacity,

            Self::StalePrice { .. }
            | Self::InvalidPrice { .. }
            | Self::PriceOutOfBounds { .. }
            | Self::InvalidProof
            | Self::InvalidFillAttestation => ErrorCategory::External,

            Self::MathOverflow
            | Self::DivisionByZero
            | Self::Internal(_)
            | Self::Serialization(_)
            | Self::Io(_) => ErrorCategory::Internal,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, HubError>;

impl From<std::io::Error> for HubError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
