//! Per-asset risk and rate-model parameters.
//!
//! These are the records the registry stores and the risk engine reads on
//! every check. Ordering constraints are enforced by [`RiskParams::validate`]
//! and [`AssetConfig::validate`] before anything is written.

use serde::{Deserialize, Serialize};

use crate::{
    Address, DomainId, HubError, Result,
    constants::{BPS, MAX_ASSET_DECIMALS},
};

/// Collateral and cap parameters for one asset.
///
/// Invariant: `ltv_bps ≤ liquidation_threshold_bps ≤ 10000` and
/// `liquidation_bonus_bps ≥ 10000`. Caps of zero mean "uncapped".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Loan-to-value, used for the informational borrow capacity.
    pub ltv_bps: u16,
    /// Share of collateral value counted towards the health factor.
    pub liquidation_threshold_bps: u16,
    /// Collateral premium paid to liquidators (10500 = 5% bonus).
    pub liquidation_bonus_bps: u16,
    /// Maximum total supplied assets (0 = uncapped).
    pub supply_cap: u128,
    /// Maximum total borrowed assets (0 = uncapped).
    pub borrow_cap: u128,
}

impl RiskParams {
    /// Check the ordering constraints.
    pub fn validate(&self) -> Result<()> {
        let bps = u16::try_from(BPS).map_err(|_| HubError::MathOverflow)?;
        if self.ltv_bps > self.liquidation_threshold_bps {
            return Err(HubError::InvalidRiskParams {
                reason: format!(
                    "ltv {} exceeds liquidation threshold {}",
                    self.ltv_bps, self.liquidation_threshold_bps
                ),
            });
        }
        if self.liquidation_threshold_bps > bps {
            return Err(HubError::InvalidRiskParams {
                reason: format!(
                    "liquidation threshold {} exceeds {bps}",
                    self.liquidation_threshold_bps
                ),
            });
        }
        if self.liquidation_bonus_bps < bps {
            return Err(HubError::InvalidRiskParams {
                reason: format!(
                    "liquidation bonus {} below {bps}",
                    self.liquidation_bonus_bps
                ),
            });
        }
        Ok(())
    }
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            ltv_bps: 7_500,
            liquidation_threshold_bps: 8_000,
            liquidation_bonus_bps: 10_500,
            supply_cap: 0,
            borrow_cap: 0,
        }
    }
}

/// Utilization-kink interest curve, expressed as annual basis points.
///
/// Below the kink the borrow rate rises linearly from `base_rate_bps` by
/// `slope1_bps`; above it the remaining utilization adds `slope2_bps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateModelParams {
    pub base_rate_bps: u32,
    pub slope1_bps: u32,
    pub slope2_bps: u32,
    /// Utilization at which the second slope starts, in bps (0 < kink < 10000).
    pub kink_bps: u32,
}

impl RateModelParams {
    pub fn validate(&self) -> Result<()> {
        if self.kink_bps == 0 || u128::from(self.kink_bps) >= BPS {
            return Err(HubError::InvalidRiskParams {
                reason: format!("kink {} must lie strictly inside (0, {BPS})", self.kink_bps),
            });
        }
        Ok(())
    }
}

impl Default for RateModelParams {
    fn default() -> Self {
        Self {
            base_rate_bps: 0,
            slope1_bps: 400,
            slope2_bps: 7_500,
            kink_bps: 8_000,
        }
    }
}

/// Representation of a hub asset on a companion (spoke) domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanionToken {
    pub domain_id: DomainId,
    pub token: Address,
}

/// Full registry entry for one hub asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// The hub-domain asset address.
    pub asset: Address,
    /// Ticker, for logs and snapshots.
    pub symbol: String,
    /// Decimal scale of the asset.
    pub decimals: u8,
    /// Spoke-domain representations resolving to this asset.
    #[serde(default)]
    pub companions: Vec<CompanionToken>,
    pub risk: RiskParams,
    /// Share of accrued interest kept as protocol reserves.
    pub reserve_factor_bps: u16,
    #[serde(default)]
    pub rate_model: RateModelParams,
    /// Lowest oracle price accepted, in 1e8 units.
    pub min_price_e8: u128,
    /// Highest oracle price accepted, in 1e8 units.
    pub max_price_e8: u128,
    /// Disabled assets are skipped by risk checks and refuse new locks.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AssetConfig {
    pub fn validate(&self) -> Result<()> {
        if self.asset == Address::ZERO {
            return Err(HubError::ZeroAddress { what: "asset" });
        }
        if self.decimals > MAX_ASSET_DECIMALS {
            return Err(HubError::InvalidConfig(format!(
                "{}: decimals {} exceed {MAX_ASSET_DECIMALS}",
                self.symbol, self.decimals
            )));
        }
        if u128::from(self.reserve_factor_bps) > BPS {
            return Err(HubError::InvalidRiskParams {
                reason: format!("reserve factor {} exceeds {BPS}", self.reserve_factor_bps),
            });
        }
        if self.min_price_e8 == 0 || self.min_price_e8 > self.max_price_e8 {
            return Err(HubError::InvalidConfig(format!(
                "{}: price bounds [{}, {}] are invalid",
                self.symbol, self.min_price_e8, self.max_price_e8
            )));
        }
        if self.companions.iter().any(|c| c.token == Address::ZERO) {
            return Err(HubError::ZeroAddress { what: "companion token" });
        }
        self.risk.validate()?;
        self.rate_model.validate()
    }
}
