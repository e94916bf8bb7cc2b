//! Utilization-kink interest rate model.
//!
//! ```text
//!   rate
//!    │                      ╱ slope2
//!    │                    ╱
//!    │          ________╱
//!    │   ______╱ slope1
//!    │__╱ base
//!    └──────────────┼──────── utilization
//!                  kink
//! ```
//!
//! Parameters are annual basis points; outputs are per-second ray rates so
//! the ledger can multiply them directly by elapsed seconds.

use hublend_types::{
    RateModelParams, Result,
    constants::{BPS, RAY, SECONDS_PER_YEAR},
    math,
};

/// Pure rate curve for one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateModel {
    params: RateModelParams,
}

impl RateModel {
    /// Wrap validated curve parameters.
    #[must_use]
    pub fn new(params: RateModelParams) -> Self {
        Self { params }
    }

    /// The curve parameters this model evaluates.
    #[must_use]
    pub fn params(&self) -> RateModelParams {
        self.params
    }

    /// `debt / supply` in ray, capped at one ray. Zero when nothing is supplied.
    pub fn utilization(total_debt: u128, total_supply: u128) -> Result<u128> {
        if total_supply == 0 || total_debt == 0 {
            return Ok(0);
        }
        Ok(math::mul_div(total_debt, RAY, total_supply)?.min(RAY))
    }

    /// Annual borrow rate in ray at utilization `u` (ray).
    pub fn annual_borrow_rate(&self, u: u128) -> Result<u128> {
        let u = u.min(RAY);
        let base = bps_to_ray(self.params.base_rate_bps)?;
        let slope1 = bps_to_ray(self.params.slope1_bps)?;
        let kink = bps_to_ray(self.params.kink_bps)?;

        if u <= kink {
            return math::add(base, math::mul_div(slope1, u, kink)?);
        }
        let slope2 = bps_to_ray(self.params.slope2_bps)?;
        let excess = math::mul_div(slope2, u - kink, RAY - kink)?;
        math::add(math::add(base, slope1)?, excess)
    }

    /// Per-second borrow rate in ray at utilization `u`.
    pub fn borrow_rate(&self, u: u128) -> Result<u128> {
        Ok(self.annual_borrow_rate(u)? / SECONDS_PER_YEAR)
    }

    /// Per-second supply rate: borrow rate times utilization, net of reserves.
    pub fn supply_rate(&self, u: u128, reserve_factor_bps: u16) -> Result<u128> {
        let gross = math::mul_div(self.borrow_rate(u)?, u.min(RAY), RAY)?;
        math::mul_div(gross, BPS - u128::from(reserve_factor_bps), BPS)
    }
}

fn bps_to_ray(bps: u32) -> Result<u128> {
    math::mul_div(u128::from(bps), RAY, BPS)
}
