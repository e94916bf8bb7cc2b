//! Price oracle collaborator.
//!
//! The hub only consumes prices; it never produces them. A quote is a
//! `priceE8` plus the time it was last updated. Implementations reject stale
//! or non-positive prices; per-asset `[min, max]` bounds are enforced by the
//! risk engine, which owns the registry.

use std::{collections::HashMap, sync::RwLock};

use hublend_types::{Address, HubError, Result};

/// Staleness-checked price source.
pub trait PriceOracle: Send + Sync {
    /// Price of `asset` in 1e8 units as of `now`.
    ///
    /// # Errors
    /// `StalePrice` when the quote is older than the oracle's window,
    /// `InvalidPrice` when no positive quote exists.
    fn price_e8(&self, asset: Address, now: u64) -> Result<u128>;
}

#[derive(Debug, Clone, Copy)]
struct Quote {
    price_e8: u128,
    updated_at: u64,
}

/// Admin-pushed prices with a fixed staleness window.
#[derive(Debug)]
pub struct StaticPriceOracle {
    max_age_secs: u64,
    quotes: RwLock<HashMap<Address, Quote>>,
}

impl StaticPriceOracle {
    /// An empty oracle rejecting quotes older than `max_age_secs`.
    #[must_use]
    pub fn new(max_age_secs: u64) -> Self {
        Self {
            max_age_secs,
            quotes: RwLock::new(HashMap::new()),
        }
    }

    /// Publish a price observed at `updated_at`.
    pub fn set_price(&self, asset: Address, price_e8: u128, updated_at: u64) -> Result<()> {
        let mut quotes = self
            .quotes
            .write()
            .map_err(|_| HubError::Internal("price table lock poisoned".into()))?;
        quotes.insert(
            asset,
            Quote {
                price_e8,
                updated_at,
            },
        );
        tracing::debug!(%asset, price_e8, updated_at, "price updated");
        Ok(())
    }

    /// Last update time of `asset`, if quoted.
    pub fn updated_at(&self, asset: Address) -> Result<Option<u64>> {
        let quotes = self
            .quotes
            .read()
            .map_err(|_| HubError::Internal("price table lock poisoned".into()))?;
        Ok(quotes.get(&asset).map(|q| q.updated_at))
    }

    /// Staleness bound applied on every read.
    #[must_use]
    pub fn max_age_secs(&self) -> u64 {
        self.max_age_secs
    }
}

impl PriceOracle for StaticPriceOracle {
    fn price_e8(&self, asset: Address, now: u64) -> Result<u128> {
        let quote = {
            let quotes = self
                .quotes
                .read()
                .map_err(|_| HubError::Internal("price table lock poisoned".into()))?;
            quotes.get(&asset).copied()
        };
        let Some(quote) = quote else {
            return Err(HubError::InvalidPrice {
                asset,
                reason: "no quote".into(),
            });
        };
        if quote.price_e8 == 0 {
            return Err(HubError::InvalidPrice {
                asset,
                reason: "price is zero".into(),
            });
        }
        if now.saturating_sub(quote.updated_at) > self.max_age_secs {
            return Err(HubError::StalePrice {
                asset,
                updated_at: quote.updated_at,
                now,
            });
        }
        Ok(quote.price_e8)
    }
}

#[cfg(test)]
mod tests {
    use hublend_types::test_address;

    use super::*;

    #[test]
    fn fresh_price_returned() {
        let oracle = StaticPriceOracle::new(60);
        oracle.set_price(test_address(1), 100_000_000, 1_000).unwrap();
        assert_eq!(oracle.price_e8(test_address(1), 1_060).unwrap(), 100_000_000);
        assert_eq!(oracle.updated_at(test_address(1)).unwrap(), Some(1_000));
    }

    #[test]
    fn stale_price_rejected() {
        let oracle = StaticPriceOracle::new(60);
        oracle.set_price(test_address(1), 100_000_000, 1_000).unwrap();
        let err = oracle.price_e8(test_address(1), 1_061).unwrap_err();
        assert!(matches!(err, HubError::StalePrice { .. }));
    }

    #[test]
    fn missing_and_zero_prices_rejected() {
        let oracle = StaticPriceOracle::new(60);
        assert!(matches!(
            oracle.price_e8(test_address(1), 0),
            Err(HubError::InvalidPrice { .. })
        ));
        oracle.set_price(test_address(1), 0, 0).unwrap();
        assert!(matches!(
            oracle.price_e8(test_address(1), 0),
            Err(HubError::InvalidPrice { .. })
        ));
    }
}
