//! Share conservation invariant checker.
//!
//! ```text
//! ∀ asset: Σ user supply shares == market.total_supply_shares
//!          Σ user debt shares   == market.total_debt_shares
//! ```
//!
//! The hub runs this after every committed batch. A violation means the
//! books no longer add up and the transaction that produced it is rejected.

use hublend_types::{Address, HubError, Result};

use crate::ledger::Ledger;

/// Verify both share totals of `asset` against the sum of positions.
///
/// # Errors
/// Returns [`HubError::ConservationViolation`] if either side disagrees.
pub fn verify_conservation(ledger: &Ledger, asset: Address) -> Result<()> {
    let market = ledger.market(asset)?;

    let supply_sum = ledger.supply_share_sum(asset);
    if supply_sum != market.total_supply_shares {
        return Err(HubError::ConservationViolation {
            reason: format!(
                "asset {asset}: supply positions {supply_sum} != total {}",
                market.total_supply_shares
            ),
        });
    }

    let debt_sum = ledger.debt_share_sum(asset);
    if debt_sum != market.total_debt_shares {
        return Err(HubError::ConservationViolation {
            reason: format!(
                "asset {asset}: debt positions {debt_sum} != total {}",
                market.total_debt_shares
            ),
        });
    }
    Ok(())
}
