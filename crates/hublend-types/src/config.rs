//! Configuration for a HubLend hub instance.
//!
//! Loaded from JSON by the simulator; constructed directly in tests. Every
//! entry point that accepts an [`EngineConfig`] calls [`EngineConfig::validate`]
//! first, so a misconfigured hub fails at setup rather than mid-settlement.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Address, AssetConfig, DomainId, HubError, Result, constants};

/// Configuration for a single hub instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The local (authoritative) domain id.
    pub hub_domain_id: DomainId,
    /// Spoke domains whose batches and deposits are accepted.
    pub counterparty_domain_ids: Vec<DomainId>,
    /// Account allowed to register and mutate risk parameters.
    pub risk_admin: Address,
    /// Account allowed to submit settlement batches.
    pub settlement_operator: Address,
    /// Account allowed to register attested custody deposits.
    pub deposit_attester: Address,
    /// Lifetime of a lock before it may be cancelled.
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,
    /// Oracle staleness window.
    #[serde(default = "default_max_price_age")]
    pub max_price_age_secs: u64,
    /// Whether relayers may record their own fill evidence.
    #[serde(default = "default_self_attested")]
    pub allow_self_attested_fills: bool,
    /// Assets registered at startup.
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

fn default_lock_ttl() -> u64 {
    constants::DEFAULT_LOCK_TTL_SECS
}

fn default_max_price_age() -> u64 {
    constants::DEFAULT_MAX_PRICE_AGE_SECS
}

fn default_self_attested() -> bool {
    true
}

impl EngineConfig {
    /// Minimal configuration with no assets.
    #[must_use]
    pub fn new(
        hub_domain_id: DomainId,
        counterparty_domain_ids: Vec<DomainId>,
        admin: Address,
    ) -> Self {
        Self {
            hub_domain_id,
            counterparty_domain_ids,
            risk_admin: admin,
            settlement_operator: admin,
            deposit_attester: admin,
            lock_ttl_secs: default_lock_ttl(),
            max_price_age_secs: default_max_price_age(),
            allow_self_attested_fills: default_self_attested(),
            assets: Vec::new(),
        }
    }

    /// Parse a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Fail fast on wiring mistakes.
    pub fn validate(&self) -> Result<()> {
        if self.risk_admin == Address::ZERO {
            return Err(HubError::InvalidRiskManager {
                reason: "risk admin is the zero address".into(),
            });
        }
        if self.settlement_operator == Address::ZERO {
            return Err(HubError::InvalidSettlement {
                reason: "settlement operator is the zero address".into(),
            });
        }
        if self.deposit_attester == Address::ZERO {
            return Err(HubError::ZeroAddress { what: "deposit attester" });
        }
        if self.counterparty_domain_ids.contains(&self.hub_domain_id) {
            return Err(HubError::InvalidConfig(format!(
                "{} is both hub and counterparty",
                self.hub_domain_id
            )));
        }
        if self.lock_ttl_secs == 0 {
            return Err(HubError::InvalidConfig("lock_ttl_secs must be > 0".into()));
        }
        for (i, asset) in self.assets.iter().enumerate() {
            asset.validate()?;
            if self.assets[..i].iter().any(|a| a.asset == asset.asset) {
                return Err(HubError::AssetAlreadyRegistered(asset.asset));
            }
        }
        Ok(())
    }

    /// True when `domain` is a configured spoke.
    #[must_use]
    pub fn is_counterparty(&self, domain: DomainId) -> bool {
        self.counterparty_domain_ids.contains(&domain)
    }
}
