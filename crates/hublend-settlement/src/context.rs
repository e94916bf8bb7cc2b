//! Read-only inputs shared by one hub call.

use hublend_ledger::{Ledger, PriceOracle, Registry, Reservations, RiskEngine};

/// Registry, oracle and clock reading for the duration of one operation.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub registry: &'a Registry,
    pub oracle: &'a dyn PriceOracle,
    pub now: u64,
}

impl<'a> Context<'a> {
    /// Bundle the registry and oracle as seen at `now`.
    #[must_use]
    pub fn new(registry: &'a Registry, oracle: &'a dyn PriceOracle, now: u64) -> Self {
        Self {
            registry,
            oracle,
            now,
        }
    }

    /// Risk view over `ledger` and the live `reservations`.
    #[must_use]
    pub fn risk<'b>(&'b self, ledger: &'b Ledger, reservations: &'b Reservations) -> RiskEngine<'b>
    where
        'a: 'b,
    {
        RiskEngine::new(self.registry, ledger, reservations, self.oracle, self.now)
    }
}
