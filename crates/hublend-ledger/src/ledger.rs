//! Share-based accounting ledger.
//!
//! Holds every market, every user position (supply and debt shares), and the
//! hub token wallets. Positions are stored as shares; asset amounts are
//! derived through the market indexes, which accrue before every touch.
//!
//! ## Entry points
//!
//! ```text
//!   direct          supply · repay · deposit_tokens
//!   risk-gated      withdraw · borrow · liquidate          (Approval)
//!   settlement      credit_supply · credit_repay           (SettlementCap)
//!   both            finalize_borrow · finalize_withdraw    (SettlementCap + Approval)
//! ```
//!
//! A `SettlementCap` is minted exactly once, by [`Ledger::new`]. It cannot be
//! cloned or constructed elsewhere, and it only opens the ledger that issued
//! it. Clones of a ledger keep the same id, so a working copy taken for a
//! transaction accepts the same capability.

use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicU64, Ordering},
};

use hublend_types::{Address, HubError, HubEvent, IntentId, LockKind, Result, math};

use crate::{
    balances::TokenBalances,
    market::Market,
    rate_model::RateModel,
    registry::Registry,
    risk::{Approval, Grant},
};

static NEXT_LEDGER_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// SettlementCap
// ---------------------------------------------------------------------------

/// Capability for the settlement-only entry points of one ledger.
#[derive(Debug)]
pub struct SettlementCap {
    ledger_id: u64,
}

impl SettlementCap {
    /// Id of the ledger that issued this capability.
    #[must_use]
    pub fn ledger_id(&self) -> u64 {
        self.ledger_id
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a repay, direct or credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepayOutcome {
    /// Amount applied against debt.
    pub repaid: u128,
    /// Debt shares burned.
    pub shares_burned: u128,
    /// Amount refunded to the user's hub wallet.
    pub surplus: u128,
}

/// Result of a liquidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationOutcome {
    pub repaid: u128,
    pub debt_shares_burned: u128,
    pub seized: u128,
    pub seized_shares: u128,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

type PositionKey = (Address, Address);

/// The hub's books.
#[derive(Debug, Clone)]
pub struct Ledger {
    id: u64,
    settlement_operator: Address,
    markets: BTreeMap<Address, Market>,
    supply_shares: ShareBook,
    debt_shares: ShareBook,
    wallets: TokenBalances,
    /// Events emitted since the last drain.
    events: Vec<HubEvent>,
}

impl Ledger {
    /// Create an empty ledger and the capability for its settlement-only
    /// entry points.
    pub fn new(settlement_operator: Address) -> Result<(Self, SettlementCap)> {
        if settlement_operator == Address::ZERO {
            return Err(HubError::InvalidSettlement {
                reason: "settlement operator is the zero address".into(),
            });
        }
        let id = NEXT_LEDGER_ID.fetch_add(1, Ordering::Relaxed);
        let ledger = Self {
            id,
            settlement_operator,
            markets: BTreeMap::new(),
            supply_shares: ShareBook::default(),
            debt_shares: ShareBook::default(),
            wallets: TokenBalances::new(),
            events: Vec::new(),
        };
        Ok((ledger, SettlementCap { ledger_id: id }))
    }

    /// Process-unique id; capabilities and lock managers bind to it.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Address allowed to submit settlement batches.
    #[must_use]
    pub fn settlement_operator(&self) -> Address {
        self.settlement_operator
    }

    /// Reject a capability issued by another ledger.
    pub fn verify_cap(&self, cap: &SettlementCap) -> Result<()> {
        if cap.ledger_id != self.id {
            return Err(HubError::InvalidSettlement {
                reason: format!(
                    "capability for ledger {} presented to ledger {}",
                    cap.ledger_id, self.id
                ),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Append an event to the journal.
    pub fn emit(&mut self, event: HubEvent) {
        self.events.push(event);
    }

    /// Events emitted since the last drain, oldest first.
    #[must_use]
    pub fn events(&self) -> &[HubEvent] {
        &self.events
    }

    /// Take the buffered events, leaving the buffer empty.
    pub fn drain_events(&mut self) -> Vec<HubEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Markets and accrual
    // -----------------------------------------------------------------------

    /// Open the market for a newly registered asset.
    pub fn init_market(&mut self, asset: Address, now: u64) -> Result<()> {
        if self.markets.contains_key(&asset) {
            return Err(HubError::AssetAlreadyRegistered(asset));
        }
        self.markets.insert(asset, Market::new(asset, now));
        Ok(())
    }

    /// Market state of `asset` at its last accrual.
    ///
    /// # Errors
    /// Returns `UnsupportedAsset` if no market was opened for `asset`.
    pub fn market(&self, asset: Address) -> Result<&Market> {
        self.markets
            .get(&asset)
            .ok_or(HubError::UnsupportedAsset(asset))
    }

    fn market_mut(&mut self, asset: Address) -> Result<&mut Market> {
        self.markets
            .get_mut(&asset)
            .ok_or(HubError::UnsupportedAsset(asset))
    }

    /// Every market, ordered by asset address.
    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    /// Bring one market's indexes up to `now`.
    pub fn accrue_interest(&mut self, registry: &Registry, asset: Address, now: u64) -> Result<()> {
        let cfg = registry.get(asset)?;
        let model = RateModel::new(cfg.rate_model);
        let reserve_factor = cfg.reserve_factor_bps;
        let market = self.market_mut(asset)?;
        let had_debt = market.total_debt_shares > 0;
        if !market.accrue(&model, reserve_factor, now)? || !had_debt {
            return Ok(());
        }
        let event = HubEvent::InterestAccrued {
            asset,
            borrow_index: market.borrow_index,
            supply_index: market.supply_index,
            reserves: market.reserves,
            timestamp: now,
        };
        tracing::trace!(
            %asset,
            borrow_index = market.borrow_index,
            supply_index = market.supply_index,
            "interest accrued"
        );
        self.emit(event);
        Ok(())
    }

    /// Accrue every market.
    pub fn accrue_all(&mut self, registry: &Registry, now: u64) -> Result<()> {
        let assets: Vec<Address> = self.markets.keys().copied().collect();
        for asset in assets {
            self.accrue_interest(registry, asset, now)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Positions
    // -----------------------------------------------------------------------

    /// Supply shares `user` holds in `asset`; zero when none.
    #[must_use]
    pub fn supply_shares(&self, user: Address, asset: Address) -> u128 {
        self.supply_shares.get(user, asset)
    }

    /// Debt shares `user` owes in `asset`; zero when none.
    #[must_use]
    pub fn debt_shares(&self, user: Address, asset: Address) -> u128 {
        self.debt_shares.get(user, asset)
    }

    /// Supplied assets at the stored supply index.
    pub fn supply_balance(&self, user: Address, asset: Address) -> Result<u128> {
        self.market(asset)?
            .supply_assets(self.supply_shares(user, asset))
    }

    /// Outstanding debt at the stored borrow index.
    pub fn debt_balance(&self, user: Address, asset: Address) -> Result<u128> {
        self.market(asset)?.debt_assets(self.debt_shares(user, asset))
    }

    /// Running sum of every supply position in `asset`.
    pub(crate) fn supply_share_sum(&self, asset: Address) -> u128 {
        self.supply_shares.total(asset)
    }

    /// Running sum of every debt position in `asset`.
    pub(crate) fn debt_share_sum(&self, asset: Address) -> u128 {
        self.debt_shares.total(asset)
    }

    // -----------------------------------------------------------------------
    // Wallets
    // -----------------------------------------------------------------------

    /// Hub token wallets.
    #[must_use]
    pub fn wallets(&self) -> &TokenBalances {
        &self.wallets
    }

    /// Hub wallet balance of `owner` in `asset`.
    #[must_use]
    pub fn wallet_balance(&self, owner: Address, asset: Address) -> u128 {
        self.wallets.balance(owner, asset)
    }

    /// Credit hub tokens to `owner`, as delivered by the token layer.
    pub fn deposit_tokens(&mut self, owner: Address, asset: Address, amount: u128) -> Result<()> {
        ensure_amount(amount)?;
        self.market(asset)?;
        self.wallets.credit(owner, asset, amount)
    }

    // -----------------------------------------------------------------------
    // Direct operations
    // -----------------------------------------------------------------------

    /// Supply from the user's hub wallet into the pool.
    pub fn supply(
        &mut self,
        registry: &Registry,
        user: Address,
        asset: Address,
        amount: u128,
        now: u64,
    ) -> Result<u128> {
        ensure_amount(amount)?;
        let supply_cap = registry.enabled(asset)?.risk.supply_cap;
        self.accrue_interest(registry, asset, now)?;
        self.wallets.debit(user, asset, amount)?;
        let shares = self.mint_supply(supply_cap, user, asset, amount)?;
        self.add_cash(asset, amount)?;
        tracing::info!(%user, %asset, amount, shares, "supplied");
        self.emit(HubEvent::Supplied {
            user,
            asset,
            amount,
            shares,
        });
        Ok(shares)
    }

    /// Withdraw to the user's hub wallet.
    pub fn withdraw(&mut self, registry: &Registry, approval: Approval, now: u64) -> Result<u128> {
        let (user, asset, amount) = expect_grant(&approval, LockKind::Withdraw)?;
        self.accrue_interest(registry, asset, now)?;
        let shares = self.burn_supply(user, asset, amount)?;
        self.take_cash(asset, amount)?;
        self.wallets.credit(user, asset, amount)?;
        tracing::info!(%user, %asset, amount, shares, "withdrawn");
        self.emit(HubEvent::Withdrawn {
            user,
            asset,
            amount,
            shares,
        });
        Ok(shares)
    }

    /// Borrow to the user's hub wallet.
    pub fn borrow(&mut self, registry: &Registry, approval: Approval, now: u64) -> Result<u128> {
        let (user, asset, amount) = expect_grant(&approval, LockKind::Borrow)?;
        let borrow_cap = registry.enabled(asset)?.risk.borrow_cap;
        self.accrue_interest(registry, asset, now)?;
        self.take_cash(asset, amount)?;
        let shares = self.mint_debt(borrow_cap, user, asset, amount)?;
        self.wallets.credit(user, asset, amount)?;
        tracing::info!(%user, %asset, amount, shares, "borrowed");
        self.emit(HubEvent::Borrowed {
            user,
            asset,
            amount,
            shares,
        });
        Ok(shares)
    }

    /// Repay `user`'s debt from `payer`'s hub wallet. The amount is clamped
    /// to the outstanding debt; only the applied part is debited.
    pub fn repay(
        &mut self,
        registry: &Registry,
        payer: Address,
        user: Address,
        asset: Address,
        amount: u128,
        now: u64,
    ) -> Result<RepayOutcome> {
        ensure_amount(amount)?;
        registry.get(asset)?;
        self.accrue_interest(registry, asset, now)?;
        if self.debt_shares(user, asset) == 0 {
            return Err(HubError::NoDebt(user));
        }
        let debt = self.debt_balance(user, asset)?;
        let applied = amount.min(debt);
        self.wallets.debit(payer, asset, applied)?;
        let shares_burned = self.burn_debt(user, asset, applied)?;
        self.add_cash(asset, applied)?;
        tracing::info!(%payer, %user, %asset, repaid = applied, "repaid");
        self.emit(HubEvent::Repaid {
            payer,
            user,
            asset,
            amount: applied,
            shares: shares_burned,
        });
        Ok(RepayOutcome {
            repaid: applied,
            shares_burned,
            surplus: 0,
        })
    }

    /// Repay on behalf of an unhealthy borrower and seize collateral.
    ///
    /// The liquidator pays from its hub wallet and receives the seized
    /// collateral as supply shares moved out of the borrower's position.
    pub fn liquidate(
        &mut self,
        registry: &Registry,
        approval: Approval,
        now: u64,
    ) -> Result<LiquidationOutcome> {
        let Grant::Liquidate {
            liquidator,
            collateral_asset,
            seize,
        } = approval.grant
        else {
            return Err(wrong_grant("liquidate"));
        };
        let (borrower, debt_asset, repay) = (approval.user, approval.asset, approval.amount);
        self.accrue_interest(registry, debt_asset, now)?;
        self.accrue_interest(registry, collateral_asset, now)?;

        self.wallets.debit(liquidator, debt_asset, repay)?;
        let debt_shares_burned = self.burn_debt(borrower, debt_asset, repay)?;
        self.add_cash(debt_asset, repay)?;
        let seized_shares = self.transfer_supply(borrower, liquidator, collateral_asset, seize)?;

        tracing::info!(
            %liquidator,
            %borrower,
            %debt_asset,
            repay,
            %collateral_asset,
            seize,
            "position liquidated"
        );
        self.emit(HubEvent::Liquidated {
            liquidator,
            borrower,
            debt_asset,
            repaid: repay,
            collateral_asset,
            seized: seize,
        });
        Ok(LiquidationOutcome {
            repaid: repay,
            debt_shares_burned,
            seized: seize,
            seized_shares,
        })
    }

    // -----------------------------------------------------------------------
    // Settlement-only operations
    // -----------------------------------------------------------------------

    /// Credit a custody-released supply deposit.
    pub fn credit_supply(
        &mut self,
        cap: &SettlementCap,
        registry: &Registry,
        user: Address,
        asset: Address,
        amount: u128,
        now: u64,
    ) -> Result<u128> {
        self.verify_cap(cap)?;
        ensure_amount(amount)?;
        let supply_cap = registry.get(asset)?.risk.supply_cap;
        self.accrue_interest(registry, asset, now)?;
        let shares = self.mint_supply(supply_cap, user, asset, amount)?;
        self.add_cash(asset, amount)?;
        tracing::debug!(%user, %asset, amount, shares, "supply credited");
        self.emit(HubEvent::SupplyCredited {
            user,
            asset,
            amount,
            shares,
        });
        Ok(shares)
    }

    /// Credit a custody-released repay deposit. Anything above the
    /// outstanding debt is refunded to the user's hub wallet.
    pub fn credit_repay(
        &mut self,
        cap: &SettlementCap,
        registry: &Registry,
        user: Address,
        asset: Address,
        amount: u128,
        now: u64,
    ) -> Result<RepayOutcome> {
        self.verify_cap(cap)?;
        ensure_amount(amount)?;
        registry.get(asset)?;
        self.accrue_interest(registry, asset, now)?;

        let debt = self.debt_balance(user, asset)?;
        let applied = amount.min(debt);
        let shares_burned = if self.debt_shares(user, asset) == 0 {
            0
        } else {
            self.burn_debt(user, asset, applied)?
        };
        self.add_cash(asset, applied)?;
        let surplus = amount - applied;

        tracing::debug!(%user, %asset, repaid = applied, surplus, "repay credited");
        self.emit(HubEvent::RepayCredited {
            user,
            asset,
            amount: applied,
            shares: shares_burned,
        });
        if surplus > 0 {
            self.wallets.credit(user, asset, surplus)?;
            tracing::info!(%user, %asset, surplus, "repay surplus refunded");
            self.emit(HubEvent::RepaySurplusRefunded {
                user,
                asset,
                amount: surplus,
            });
        }
        Ok(RepayOutcome {
            repaid: applied,
            shares_burned,
            surplus,
        })
    }

    /// Book the debt for a fulfilled borrow and reimburse the relayer on
    /// the hub.
    pub fn finalize_borrow(
        &mut self,
        cap: &SettlementCap,
        registry: &Registry,
        approval: Approval,
        intent_id: IntentId,
        relayer: Address,
        now: u64,
    ) -> Result<u128> {
        self.verify_cap(cap)?;
        let (user, asset, amount) = expect_grant(&approval, LockKind::Borrow)?;
        let borrow_cap = registry.get(asset)?.risk.borrow_cap;
        self.accrue_interest(registry, asset, now)?;
        self.take_cash(asset, amount)?;
        let shares = self.mint_debt(borrow_cap, user, asset, amount)?;
        self.wallets.credit(relayer, asset, amount)?;
        tracing::debug!(intent = %intent_id.short(), %user, %asset, amount, "borrow finalized");
        self.emit(HubEvent::BorrowFinalized {
            intent_id,
            user,
            asset,
            amount,
            relayer,
        });
        Ok(shares)
    }

    /// Burn the collateral for a fulfilled withdraw and reimburse the
    /// relayer on the hub.
    pub fn finalize_withdraw(
        &mut self,
        cap: &SettlementCap,
        registry: &Registry,
        approval: Approval,
        intent_id: IntentId,
        relayer: Address,
        now: u64,
    ) -> Result<u128> {
        self.verify_cap(cap)?;
        let (user, asset, amount) = expect_grant(&approval, LockKind::Withdraw)?;
        registry.get(asset)?;
        self.accrue_interest(registry, asset, now)?;
        let shares = self.burn_supply(user, asset, amount)?;
        self.take_cash(asset, amount)?;
        self.wallets.credit(relayer, asset, amount)?;
        tracing::debug!(intent = %intent_id.short(), %user, %asset, amount, "withdraw finalized");
        self.emit(HubEvent::WithdrawFinalized {
            intent_id,
            user,
            asset,
            amount,
            relayer,
        });
        Ok(shares)
    }

    // -----------------------------------------------------------------------
    // Share bookkeeping
    // -----------------------------------------------------------------------

    fn add_cash(&mut self, asset: Address, amount: u128) -> Result<()> {
        let market = self.market_mut(asset)?;
        market.cash = math::add(market.cash, amount)?;
        Ok(())
    }

    fn take_cash(&mut self, asset: Address, amount: u128) -> Result<()> {
        let market = self.market_mut(asset)?;
        if market.cash < amount {
            return Err(HubError::InsufficientLiquidity {
                asset,
                requested: amount,
                available: market.cash,
            });
        }
        market.cash -= amount;
        Ok(())
    }

    fn mint_supply(&mut self, cap: u128, user: Address, asset: Address, amount: u128) -> Result<u128> {
        let market = self.market_mut(asset)?;
        let total = market.total_supply_assets()?;
        if cap != 0 && math::add(total, amount)? > cap {
            return Err(HubError::SupplyNotAllowed {
                asset,
                reason: format!("supply cap {cap} exceeded ({total} + {amount})"),
            });
        }
        let shares = market.supply_shares_to_mint(amount)?;
        if shares == 0 {
            return Err(HubError::SupplyNotAllowed {
                asset,
                reason: format!("{amount} mints no shares"),
            });
        }
        market.total_supply_shares = math::add(market.total_supply_shares, shares)?;
        self.supply_shares.credit((user, asset), shares)?;
        Ok(shares)
    }

    fn mint_debt(&mut self, cap: u128, user: Address, asset: Address, amount: u128) -> Result<u128> {
        let market = self.market_mut(asset)?;
        let total = market.total_debt_assets()?;
        if cap != 0 && math::add(total, amount)? > cap {
            return Err(HubError::BorrowNotAllowed {
                asset,
                reason: format!("borrow cap {cap} exceeded ({total} + {amount})"),
            });
        }
        let shares = market.debt_shares_to_mint(amount)?;
        if shares == 0 {
            return Err(HubError::BorrowNotAllowed {
                asset,
                reason: format!("{amount} mints no shares"),
            });
        }
        market.total_debt_shares = math::add(market.total_debt_shares, shares)?;
        self.debt_shares.credit((user, asset), shares)?;
        Ok(shares)
    }

    /// Shares covering `amount` of `user`'s supply: rounded up, or the
    /// whole position when `amount` is the whole balance.
    fn supply_shares_for(&self, user: Address, asset: Address, amount: u128) -> Result<u128> {
        let market = self.market(asset)?;
        let held = self.supply_shares(user, asset);
        let balance = market.supply_assets(held)?;
        if amount > balance {
            return Err(HubError::WithdrawNotAllowed {
                asset,
                reason: format!("{amount} exceeds supplied balance {balance}"),
            });
        }
        if amount == balance {
            return Ok(held);
        }
        Ok(market.supply_shares_to_burn(amount)?.min(held))
    }

    fn burn_supply(&mut self, user: Address, asset: Address, amount: u128) -> Result<u128> {
        let shares = self.supply_shares_for(user, asset, amount)?;
        self.supply_shares.debit((user, asset), shares)?;
        let market = self.market_mut(asset)?;
        market.total_supply_shares = math::sub(market.total_supply_shares, shares)?;
        Ok(shares)
    }

    fn transfer_supply(&mut self, from: Address, to: Address, asset: Address, amount: u128) -> Result<u128> {
        let held = self.supply_shares(from, asset);
        let balance = self.market(asset)?.supply_assets(held)?;
        if amount > balance {
            return Err(HubError::InsufficientCollateral {
                seize: amount,
                available: balance,
            });
        }
        let shares = self.supply_shares_for(from, asset, amount)?;
        self.supply_shares.debit((from, asset), shares)?;
        self.supply_shares.credit((to, asset), shares)?;
        Ok(shares)
    }

    /// Burn debt shares for `amount`; paying off the whole balance burns
    /// every share, anything less truncates.
    fn burn_debt(&mut self, user: Address, asset: Address, amount: u128) -> Result<u128> {
        let market = self.market(asset)?;
        let held = self.debt_shares(user, asset);
        let debt = market.debt_assets(held)?;
        let shares = if amount >= debt {
            held
        } else {
            market.debt_shares_to_burn(amount)?.min(held)
        };
        self.debt_shares.debit((user, asset), shares)?;
        let market = self.market_mut(asset)?;
        market.total_debt_shares = math::sub(market.total_debt_shares, shares)?;
        Ok(shares)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ensure_amount(amount: u128) -> Result<()> {
    if amount == 0 {
        return Err(HubError::ZeroAmount);
    }
    Ok(())
}

fn wrong_grant(operation: &str) -> HubError {
    HubError::InvalidRiskManager {
        reason: format!("approval does not cover {operation}"),
    }
}

fn expect_grant(approval: &Approval, kind: LockKind) -> Result<(Address, Address, u128)> {
    let matches = matches!(
        (approval.grant, kind),
        (Grant::Borrow, LockKind::Borrow) | (Grant::Withdraw, LockKind::Withdraw)
    );
    if !matches {
        return Err(wrong_grant(&kind.to_string()));
    }
    Ok((approval.user, approval.asset, approval.amount))
}

// ---------------------------------------------------------------------------
// ShareBook
// ---------------------------------------------------------------------------

/// `(user, asset) → shares`, with a running per-asset total kept in step
/// with every credit and debit.
#[derive(Debug, Clone, Default)]
struct ShareBook {
    positions: HashMap<PositionKey, u128>,
    totals: HashMap<Address, u128>,
}

impl ShareBook {
    fn get(&self, user: Address, asset: Address) -> u128 {
        self.positions.get(&(user, asset)).copied().unwrap_or(0)
    }

    fn total(&self, asset: Address) -> u128 {
        self.totals.get(&asset).copied().unwrap_or(0)
    }

    fn credit(&mut self, key: PositionKey, shares: u128) -> Result<()> {
        let position = math::add(self.get(key.0, key.1), shares)?;
        let total = math::add(self.total(key.1), shares)?;
        self.positions.insert(key, position);
        self.totals.insert(key.1, total);
        Ok(())
    }

    fn debit(&mut self, key: PositionKey, shares: u128) -> Result<()> {
        let position = math::sub(self.get(key.0, key.1), shares)?;
        let total = math::sub(self.total(key.1), shares)?;
        if position == 0 {
            self.positions.remove(&key);
        } else {
            self.positions.insert(key, position);
        }
        self.totals.insert(key.1, total);
        Ok(())
    }

    /// Full scan of the positions in `asset`.
    #[cfg(test)]
    fn recount(&self, asset: Address) -> u128 {
        self.positions
            .iter()
            .filter(|((_, a), _)| *a == asset)
            .fold(0u128, |acc, (_, shares)| acc.saturating_add(*shares))
    }
}
