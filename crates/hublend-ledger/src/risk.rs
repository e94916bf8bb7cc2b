//! Risk engine: health factor and capacity checks.
//!
//! ```text
//!   adjusted_collateral = Σ (supply − reserved_withdraw) · price · liq_threshold
//!   debt_value          = Σ (debt + reserved_debt) · price
//!   HF                  = adjusted_collateral · 1e18 / debt_value    (∞ without debt)
//! ```
//!
//! Values are in `priceE8` units after scaling each amount by its asset's
//! decimals. Only registered, enabled assets participate. Every price read is
//! bounds-checked against the asset's configured `[min, max]`.
//!
//! A passing check returns an [`Approval`]. Approvals cannot be built outside
//! this crate, so the ledger's risk-gated entry points are only reachable
//! through a check that succeeded against current state.

use alloy_primitives::U256;
use hublend_types::{
    Address, AssetConfig, HubError, LockKind, Result,
    constants::{BPS, HEALTH_FACTOR_INFINITE, WAD},
    math,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    ledger::Ledger, oracle::PriceOracle, registry::Registry, reservations::Reservations,
};

// ---------------------------------------------------------------------------
// Approval
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Grant {
    Borrow,
    Withdraw,
    Liquidate {
        liquidator: Address,
        collateral_asset: Address,
        seize: u128,
    },
}

/// Proof that a risk check passed for one exact `(user, asset, amount)`.
///
/// For liquidations `user` is the borrower, `asset` the debt asset and
/// `amount` the clamped repay amount.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an approval has no effect until it is spent"]
pub struct Approval {
    pub(crate) grant: Grant,
    pub(crate) user: Address,
    pub(crate) asset: Address,
    pub(crate) amount: u128,
}

impl Approval {
    fn new(grant: Grant, user: Address, asset: Address, amount: u128) -> Self {
        Self {
            grant,
            user,
            asset,
            amount,
        }
    }

    /// The user the check ran for (the borrower, for liquidations).
    #[must_use]
    pub fn user(&self) -> Address {
        self.user
    }

    #[must_use]
    pub fn asset(&self) -> Address {
        self.asset
    }

    /// Approved amount; the clamped repay for liquidations.
    #[must_use]
    pub fn amount(&self) -> u128 {
        self.amount
    }

    /// The lock kind this approval covers, if it is a borrow or withdraw.
    #[must_use]
    pub fn lock_kind(&self) -> Option<LockKind> {
        match self.grant {
            Grant::Borrow => Some(LockKind::Borrow),
            Grant::Withdraw => Some(LockKind::Withdraw),
            Grant::Liquidate { .. } => None,
        }
    }

    /// Seized collateral amount, for liquidation approvals.
    #[must_use]
    pub fn seize(&self) -> Option<u128> {
        match self.grant {
            Grant::Liquidate { seize, .. } => Some(seize),
            _ => None,
        }
    }

    /// True when this approval is for exactly this borrow or withdraw.
    #[must_use]
    pub fn covers(&self, kind: LockKind, user: Address, asset: Address, amount: u128) -> bool {
        self.lock_kind() == Some(kind)
            && self.user == user
            && self.asset == asset
            && self.amount == amount
    }

    #[cfg(test)]
    pub(crate) fn test_borrow(user: Address, asset: Address, amount: u128) -> Self {
        Self::new(Grant::Borrow, user, asset, amount)
    }

    #[cfg(test)]
    pub(crate) fn test_withdraw(user: Address, asset: Address, amount: u128) -> Self {
        Self::new(Grant::Withdraw, user, asset, amount)
    }

    #[cfg(test)]
    pub(crate) fn test_liquidate(
        liquidator: Address,
        borrower: Address,
        debt_asset: Address,
        repay: u128,
        collateral_asset: Address,
        seize: u128,
    ) -> Self {
        let grant = Grant::Liquidate {
            liquidator,
            collateral_asset,
            seize,
        };
        Self::new(grant, borrower, debt_asset, repay)
    }
}

// ---------------------------------------------------------------------------
// AccountSnapshot
// ---------------------------------------------------------------------------

/// Human-facing account view. Values are quoted in the oracle's unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSnapshot {
    pub user: Address,
    pub collateral_value: Decimal,
    pub adjusted_collateral_value: Decimal,
    pub debt_value: Decimal,
    /// LTV-weighted collateral minus debt, floored at zero.
    pub borrow_capacity: Decimal,
    /// `None` when the account has no debt.
    pub health_factor: Option<Decimal>,
    pub liquidatable: bool,
}

// ---------------------------------------------------------------------------
// RiskEngine
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
struct Valuation {
    collateral: u128,
    adjusted: u128,
    ltv_capacity: u128,
    debt: u128,
}

impl Valuation {
    /// Saturates at [`HEALTH_FACTOR_INFINITE`] when the ratio exceeds `u128`.
    fn health_factor(&self) -> u128 {
        if self.debt == 0 {
            return HEALTH_FACTOR_INFINITE;
        }
        math::mul_div(self.adjusted, WAD, self.debt).unwrap_or(HEALTH_FACTOR_INFINITE)
    }
}

/// Hypothetical change applied on top of current state.
type Delta = Option<(LockKind, Address, u128)>;

/// Read-only view over the ledger, registry, oracle and live reservations
/// at one instant.
pub struct RiskEngine<'a> {
    registry: &'a Registry,
    ledger: &'a Ledger,
    reservations: &'a Reservations,
    oracle: &'a dyn PriceOracle,
    now: u64,
}

impl<'a> RiskEngine<'a> {
    #[must_use]
    pub fn new(
        registry: &'a Registry,
        ledger: &'a Ledger,
        reservations: &'a Reservations,
        oracle: &'a dyn PriceOracle,
        now: u64,
    ) -> Self {
        Self {
            registry,
            ledger,
            reservations,
            oracle,
            now,
        }
    }

    /// Oracle price of `cfg.asset`, bounds-checked.
    pub fn price(&self, cfg: &AssetConfig) -> Result<u128> {
        let price = self.oracle.price_e8(cfg.asset, self.now)?;
        if price < cfg.min_price_e8 || price > cfg.max_price_e8 {
            return Err(HubError::PriceOutOfBounds {
                asset: cfg.asset,
                price,
                min: cfg.min_price_e8,
                max: cfg.max_price_e8,
            });
        }
        Ok(price)
    }

    fn valuation(&self, user: Address, delta: Delta, with_reservations: bool) -> Result<Valuation> {
        let mut v = Valuation::default();
        for cfg in self.registry.enabled_assets() {
            let asset = cfg.asset;
            let mut supply = self.ledger.supply_balance(user, asset)?;
            let mut debt = self.ledger.debt_balance(user, asset)?;
            if with_reservations {
                supply = supply.saturating_sub(self.reservations.withdraw(user, asset));
                debt = math::add(debt, self.reservations.debt(user, asset))?;
            }
            match delta {
                Some((LockKind::Withdraw, a, amount)) if a == asset => {
                    supply = supply.saturating_sub(amount);
                }
                Some((LockKind::Borrow, a, amount)) if a == asset => {
                    debt = math::add(debt, amount)?;
                }
                _ => {}
            }
            if supply == 0 && debt == 0 {
                continue;
            }

            let price = self.price(cfg)?;
            let scale = math::pow10(cfg.decimals)?;
            let supply_value = math::mul_div(supply, price, scale)?;
            let debt_value = math::mul_div(debt, price, scale)?;
            let threshold = u128::from(cfg.risk.liquidation_threshold_bps);
            let ltv = u128::from(cfg.risk.ltv_bps);

            v.collateral = math::add(v.collateral, supply_value)?;
            v.adjusted = math::add(v.adjusted, math::apply_bps(supply_value, threshold)?)?;
            v.ltv_capacity = math::add(v.ltv_capacity, math::apply_bps(supply_value, ltv)?)?;
            v.debt = math::add(v.debt, debt_value)?;
        }
        Ok(v)
    }

    /// Health factor including live reservations, in WAD.
    pub fn health_factor(&self, user: Address) -> Result<u128> {
        Ok(self.valuation(user, None, true)?.health_factor())
    }

    /// Health factor on actual positions only.
    pub fn actual_health_factor(&self, user: Address) -> Result<u128> {
        Ok(self.valuation(user, None, false)?.health_factor())
    }

    /// True when the actual health factor is below one.
    pub fn is_liquidatable(&self, user: Address) -> Result<bool> {
        Ok(self.actual_health_factor(user)? < WAD)
    }

    // -----------------------------------------------------------------------
    // Capacity checks
    // -----------------------------------------------------------------------

    /// Check a borrow lock before it reserves anything.
    pub fn check_lock_borrow(&self, user: Address, asset: Address, amount: u128) -> Result<Approval> {
        self.check(LockKind::Borrow, user, asset, amount)
    }

    /// Check a withdraw lock before it reserves anything.
    pub fn check_lock_withdraw(&self, user: Address, asset: Address, amount: u128) -> Result<Approval> {
        self.check(LockKind::Withdraw, user, asset, amount)
    }

    /// Check a borrow executed now (direct, or at finalization).
    pub fn check_user_borrow(&self, user: Address, asset: Address, amount: u128) -> Result<Approval> {
        self.check(LockKind::Borrow, user, asset, amount)
    }

    /// Check a withdraw executed now (direct, or at finalization).
    pub fn check_user_withdraw(&self, user: Address, asset: Address, amount: u128) -> Result<Approval> {
        self.check(LockKind::Withdraw, user, asset, amount)
    }

    fn check(&self, kind: LockKind, user: Address, asset: Address, amount: u128) -> Result<Approval> {
        if amount == 0 {
            return Err(HubError::ZeroAmount);
        }
        let cfg = self.registry.enabled(asset)?;
        let market = self.ledger.market(asset)?;

        let available = market.cash.saturating_sub(self.reservations.liquidity(asset));
        if available < amount {
            return Err(HubError::InsufficientLiquidity {
                asset,
                requested: amount,
                available,
            });
        }

        match kind {
            LockKind::Borrow => {
                let cap = cfg.risk.borrow_cap;
                let total = market.total_debt_assets()?;
                if cap != 0 && math::add(total, amount)? > cap {
                    return Err(HubError::BorrowNotAllowed {
                        asset,
                        reason: format!("borrow cap {cap} exceeded ({total} + {amount})"),
                    });
                }
            }
            LockKind::Withdraw => {
                let free = self
                    .ledger
                    .supply_balance(user, asset)?
                    .saturating_sub(self.reservations.withdraw(user, asset));
                if amount > free {
                    return Err(HubError::WithdrawNotAllowed {
                        asset,
                        reason: format!("{amount} exceeds withdrawable balance {free}"),
                    });
                }
            }
        }

        let hf = self
            .valuation(user, Some((kind, asset, amount)), true)?
            .health_factor();
        if hf < WAD {
            let reason = format!("health factor {hf} would fall below {WAD}");
            return Err(match kind {
                LockKind::Borrow => HubError::BorrowNotAllowed { asset, reason },
                LockKind::Withdraw => HubError::WithdrawNotAllowed { asset, reason },
            });
        }

        tracing::debug!(%user, %asset, amount, %kind, health_factor = hf, "risk check passed");
        let grant = match kind {
            LockKind::Borrow => Grant::Borrow,
            LockKind::Withdraw => Grant::Withdraw,
        };
        Ok(Approval::new(grant, user, asset, amount))
    }

    /// Check a liquidation and size the seizure.
    ///
    /// The repay amount is clamped to the outstanding debt; the seizure is
    /// `repay · debt_price · bonus · 10^coll_dec / (10^debt_dec · 10000 · coll_price)`.
    pub fn check_liquidation(
        &self,
        liquidator: Address,
        borrower: Address,
        debt_asset: Address,
        repay_amount: u128,
        collateral_asset: Address,
    ) -> Result<Approval> {
        if repay_amount == 0 {
            return Err(HubError::ZeroAmount);
        }
        let debt_cfg = self.registry.get(debt_asset)?;
        let coll_cfg = self.registry.get(collateral_asset)?;

        let hf = self.actual_health_factor(borrower)?;
        if hf >= WAD {
            return Err(HubError::NotLiquidatable {
                borrower,
                health_factor: hf,
            });
        }
        let debt = self.ledger.debt_balance(borrower, debt_asset)?;
        if debt == 0 {
            return Err(HubError::NoDebt(borrower));
        }
        let repay = repay_amount.min(debt);

        let seize = seize_amount(
            repay,
            self.price(debt_cfg)?,
            debt_cfg.decimals,
            coll_cfg.risk.liquidation_bonus_bps,
            self.price(coll_cfg)?,
            coll_cfg.decimals,
        )?;
        let available = self.ledger.supply_balance(borrower, collateral_asset)?;
        if seize > available {
            return Err(HubError::InsufficientCollateral { seize, available });
        }

        let grant = Grant::Liquidate {
            liquidator,
            collateral_asset,
            seize,
        };
        Ok(Approval::new(grant, borrower, debt_asset, repay))
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Valuation of `user` including live reservations, rendered for display.
    pub fn account_snapshot(&self, user: Address) -> Result<AccountSnapshot> {
        let v = self.valuation(user, None, true)?;
        let health_factor = if v.debt == 0 {
            None
        } else {
            Some(decimal(v.health_factor(), 18)?)
        };
        Ok(AccountSnapshot {
            user,
            collateral_value: decimal(v.collateral, 8)?,
            adjusted_collateral_value: decimal(v.adjusted, 8)?,
            debt_value: decimal(v.debt, 8)?,
            borrow_capacity: decimal(v.ltv_capacity.saturating_sub(v.debt), 8)?,
            health_factor,
            liquidatable: self.is_liquidatable(user)?,
        })
    }
}

fn seize_amount(
    repay: u128,
    debt_price: u128,
    debt_decimals: u8,
    bonus_bps: u16,
    coll_price: u128,
    coll_decimals: u8,
) -> Result<u128> {
    let overflow = || HubError::MathOverflow;
    let numerator = U256::from(repay)
        .checked_mul(U256::from(debt_price))
        .and_then(|n| n.checked_mul(U256::from(bonus_bps)))
        .and_then(|n| n.checked_mul(U256::from(math::pow10(coll_decimals).ok()?)))
        .ok_or_else(overflow)?;
    let denominator = U256::from(math::pow10(debt_decimals)?)
        .checked_mul(U256::from(BPS))
        .and_then(|d| d.checked_mul(U256::from(coll_price)))
        .ok_or_else(overflow)?;
    if denominator.is_zero() {
        return Err(HubError::DivisionByZero);
    }
    u128::try_from(numerator / denominator).map_err(|_| overflow())
}

/// Render a fixed-point integer as a `Decimal`, dropping trailing digits
/// that do not fit the 96-bit mantissa.
fn decimal(value: u128, scale: u32) -> Result<Decimal> {
    let (mut value, mut scale) = (value, scale);
    loop {
        let rendered = i128::try_from(value)
            .ok()
            .and_then(|mantissa| Decimal::try_from_i128_with_scale(mantissa, scale).ok());
        if let Some(rendered) = rendered {
            return Ok(rendered);
        }
        if scale == 0 {
            return Err(HubError::MathOverflow);
        }
        value /= 10;
        scale -= 1;
    }
}
