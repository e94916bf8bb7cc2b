//! # hublend-ledger
//!
//! **Accounting plane**: the single source of truth for balances and risk on
//! the hub domain.
//!
//! ## Architecture
//!
//! 1. **Registry**: per-asset configuration (risk, decimals, companions, rates)
//! 2. **RateModel**: utilization-kink curve, per-second ray rates
//! 3. **PriceOracle**: staleness-checked prices (external collaborator)
//! 4. **Ledger**: share-based supply/debt books with continuous accrual
//! 5. **RiskEngine**: health factor and capacity checks; issues `Approval`s
//! 6. **Reservations**: live lock aggregates the risk engine folds in
//!
//! ## Gating
//!
//! ```text
//! RiskEngine.check_*() → Approval ─┐
//!                                  ├→ Ledger.borrow / withdraw / finalize_*
//! Ledger::new() → SettlementCap ───┘   (settlement-only entry points)
//! ```
//!
//! This crate never depends on the settlement plane: calls only flow
//! downwards into it.

pub mod balances;
pub mod conservation;
pub mod ledger;
pub mod market;
pub mod oracle;
pub mod rate_model;
pub mod registry;
pub mod reservations;
pub mod risk;

pub use balances::TokenBalances;
pub use conservation::verify_conservation;
pub use ledger::{Ledger, LiquidationOutcome, RepayOutcome, SettlementCap};
pub use market::Market;
pub use oracle::{PriceOracle, StaticPriceOracle};
pub use rate_model::RateModel;
pub use registry::Registry;
pub use reservations::Reservations;
pub use risk::{AccountSnapshot, Approval, RiskEngine};
