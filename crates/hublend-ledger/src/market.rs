//! Per-asset market state.
//!
//! A market holds the aggregate share totals and the two ray indexes that
//! turn shares into assets:
//!
//! ```text
//!   supply assets = supply_shares · supply_index / RAY
//!   debt assets   = debt_shares   · borrow_index / RAY
//! ```
//!
//! Both indexes start at one ray and never decrease. `cash` is the pool's
//! token holding on the hub, i.e. the liquidity locks and withdrawals draw on.

use hublend_types::{
    Address, HubError, Result,
    constants::{BPS, RAY},
    math,
};
use serde::Serialize;

use crate::rate_model::RateModel;

/// Aggregate accounting for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Market {
    pub asset: Address,
    pub total_supply_shares: u128,
    pub total_debt_shares: u128,
    pub supply_index: u128,
    pub borrow_index: u128,
    pub reserves: u128,
    pub cash: u128,
    pub last_accrual_time: u64,
    pub initialized: bool,
}

impl Market {
    /// An empty market with both indexes at one ray, last accrued at `now`.
    #[must_use]
    pub fn new(asset: Address, now: u64) -> Self {
        Self {
            asset,
            total_supply_shares: 0,
            total_debt_shares: 0,
            supply_index: RAY,
            borrow_index: RAY,
            reserves: 0,
            cash: 0,
            last_accrual_time: now,
            initialized: true,
        }
    }

    /// All supply shares valued at the current supply index.
    pub fn total_supply_assets(&self) -> Result<u128> {
        self.supply_assets(self.total_supply_shares)
    }

    /// All debt shares valued at the current borrow index.
    pub fn total_debt_assets(&self) -> Result<u128> {
        self.debt_assets(self.total_debt_shares)
    }

    /// Asset amount `shares` of supply are worth, truncated.
    pub fn supply_assets(&self, shares: u128) -> Result<u128> {
        math::mul_div(shares, self.supply_index, RAY)
    }

    /// Asset amount `shares` of debt are worth, truncated.
    pub fn debt_assets(&self, shares: u128) -> Result<u128> {
        math::mul_div(shares, self.borrow_index, RAY)
    }

    // -----------------------------------------------------------------------
    // Share conversion
    // -----------------------------------------------------------------------

    /// Supply shares minted for `amount` (truncating).
    pub fn supply_shares_to_mint(&self, amount: u128) -> Result<u128> {
        mint(amount, self.total_supply_shares, self.total_supply_assets()?, self.supply_index)
    }

    /// Debt shares minted for `amount` (truncating).
    pub fn debt_shares_to_mint(&self, amount: u128) -> Result<u128> {
        mint(amount, self.total_debt_shares, self.total_debt_assets()?, self.borrow_index)
    }

    /// Supply shares burned to release `amount` (rounded up).
    pub fn supply_shares_to_burn(&self, amount: u128) -> Result<u128> {
        math::mul_div_up(amount, self.total_supply_shares, self.total_supply_assets()?)
    }

    /// Debt shares burned by repaying `amount` (truncating).
    pub fn debt_shares_to_burn(&self, amount: u128) -> Result<u128> {
        math::mul_div(amount, self.total_debt_shares, self.total_debt_assets()?)
    }

    // -----------------------------------------------------------------------
    // Accrual
    // -----------------------------------------------------------------------

    /// Advance both indexes to `now`. Returns `false` when no time elapsed.
    pub fn accrue(&mut self, model: &RateModel, reserve_factor_bps: u16, now: u64) -> Result<bool> {
        if now <= self.last_accrual_time {
            return Ok(false);
        }
        let dt = u128::from(now - self.last_accrual_time);
        self.last_accrual_time = now;

        let debt = self.total_debt_assets()?;
        if debt == 0 {
            return Ok(true);
        }
        let supply = self.total_supply_assets()?;
        let utilization = RateModel::utilization(debt, supply)?;
        let factor = model
            .borrow_rate(utilization)?
            .checked_mul(dt)
            .ok_or(HubError::MathOverflow)?;

        let interest = math::mul_div(debt, factor, RAY)?;
        let index_delta = math::mul_div(self.borrow_index, factor, RAY)?;
        self.borrow_index = math::add(self.borrow_index, index_delta)?;

        let reserve_cut = math::mul_div(interest, u128::from(reserve_factor_bps), BPS)?;
        if supply > 0 {
            let supply_delta =
                math::mul_div(self.supply_index, interest - reserve_cut, supply)?;
            self.supply_index = math::add(self.supply_index, supply_delta)?;
        }
        self.reserves = math::add(self.reserves, reserve_cut)?;
        Ok(true)
    }
}

fn mint(amount: u128, total_shares: u128, total_assets: u128, index: u128) -> Result<u128> {
    if total_shares == 0 || total_assets == 0 {
        return math::mul_div(amount, RAY, index);
    }
    math::mul_div(amount, total_shares, total_assets)
}
