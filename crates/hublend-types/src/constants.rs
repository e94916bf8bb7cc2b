//! System-wide constants for the HubLend engine.

use alloy_primitives::{U256, uint};

/// Fixed-point scale for indexes and per-second rates (1e27).
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Fixed-point scale for health factors (1e18).
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Basis-point denominator.
pub const BPS: u128 = 10_000;

/// Oracle price scale (prices are quoted as `priceE8`).
pub const PRICE_SCALE: u128 = 100_000_000;

/// Health factor reported for accounts without debt.
pub const HEALTH_FACTOR_INFINITE: u128 = u128::MAX;

/// Seconds in a 365-day year, used to convert annual rates to per-second.
pub const SECONDS_PER_YEAR: u128 = 31_536_000;

/// Largest decimal scale an asset may declare.
pub const MAX_ASSET_DECIMALS: u8 = 36;

/// Maximum number of actions in a single settlement batch.
pub const MAX_BATCH_ACTIONS: usize = 50;

/// Number of public inputs bound into a settlement proof.
pub const PUBLIC_INPUT_COUNT: usize = 4;

/// Prime modulus of the commitment field.
pub const FIELD_PRIME: U256 =
    uint!(21888242871839275222246405745257275088548364400416034343698204186575808495617_U256);

/// Multiplier applied to the right operand of the commitment pair hash.
pub const HASH_BETA: U256 = uint!(1315423911_U256);

/// Additive constant of the commitment pair hash.
pub const HASH_CONSTANT: U256 = uint!(11400714819323198485_U256);

/// Default lock lifetime in seconds.
pub const DEFAULT_LOCK_TTL_SECS: u64 = 3_600;

/// Default oracle staleness window in seconds.
pub const DEFAULT_MAX_PRICE_AGE_SECS: u64 = 3_600;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "HubLend";
