//! Token and risk registry.
//!
//! Maps each hub asset to its companion-domain tokens, decimal scale, risk
//! parameters and rate-model parameters. Every other component reads from
//! it; only the risk admin may change it, and every change is validated
//! before it is written.

use std::collections::{BTreeMap, HashMap};

use hublend_types::{
    Address, AssetConfig, DomainId, HubError, RateModelParams, Result, RiskParams,
};

/// Configuration store for every registered asset.
#[derive(Debug, Clone)]
pub struct Registry {
    /// Account allowed to mutate the registry.
    admin: Address,
    /// Registered assets, iterated in address order for determinism.
    assets: BTreeMap<Address, AssetConfig>,
    /// `(domain, spoke token) → hub asset`.
    companions: HashMap<(DomainId, Address), Address>,
}

impl Registry {
    /// Create an empty registry administered by `admin`.
    pub fn new(admin: Address) -> Result<Self> {
        if admin == Address::ZERO {
            return Err(HubError::InvalidRiskManager {
                reason: "registry admin is the zero address".into(),
            });
        }
        Ok(Self {
            admin,
            assets: BTreeMap::new(),
            companions: HashMap::new(),
        })
    }

    /// The risk admin allowed to change asset configuration.
    #[must_use]
    pub fn admin(&self) -> Address {
        self.admin
    }

    fn ensure_admin(&self, caller: Address, action: &'static str) -> Result<()> {
        if caller != self.admin {
            return Err(HubError::Unauthorized { caller, action });
        }
        Ok(())
    }

    /// Register a new asset and its companion tokens.
    pub fn register_asset(&mut self, caller: Address, config: AssetConfig) -> Result<()> {
        self.ensure_admin(caller, "register asset")?;
        config.validate()?;
        if self.assets.contains_key(&config.asset) {
            return Err(HubError::AssetAlreadyRegistered(config.asset));
        }
        for companion in &config.companions {
            if self
                .companions
                .contains_key(&(companion.domain_id, companion.token))
            {
                return Err(HubError::InvalidConfig(format!(
                    "token {} on {} already mapped",
                    companion.token, companion.domain_id
                )));
            }
        }
        for companion in &config.companions {
            self.companions
                .insert((companion.domain_id, companion.token), config.asset);
        }
        self.assets.insert(config.asset, config);
        Ok(())
    }

    /// Replace the risk parameters of an asset.
    pub fn set_risk_params(
        &mut self,
        caller: Address,
        asset: Address,
        params: RiskParams,
    ) -> Result<()> {
        self.ensure_admin(caller, "set risk params")?;
        params.validate()?;
        self.entry_mut(asset)?.risk = params;
        Ok(())
    }

    /// Replace the rate-model parameters of an asset.
    pub fn set_rate_model(
        &mut self,
        caller: Address,
        asset: Address,
        params: RateModelParams,
    ) -> Result<()> {
        self.ensure_admin(caller, "set rate model")?;
        params.validate()?;
        self.entry_mut(asset)?.rate_model = params;
        Ok(())
    }

    /// Enable or disable an asset.
    pub fn set_enabled(&mut self, caller: Address, asset: Address, enabled: bool) -> Result<()> {
        self.ensure_admin(caller, "toggle asset")?;
        self.entry_mut(asset)?.enabled = enabled;
        Ok(())
    }

    fn entry_mut(&mut self, asset: Address) -> Result<&mut AssetConfig> {
        self.assets
            .get_mut(&asset)
            .ok_or(HubError::UnsupportedAsset(asset))
    }

    /// Look up a registered asset (enabled or not).
    pub fn get(&self, asset: Address) -> Result<&AssetConfig> {
        self.assets
            .get(&asset)
            .ok_or(HubError::UnsupportedAsset(asset))
    }

    /// Look up a registered, enabled asset.
    pub fn enabled(&self, asset: Address) -> Result<&AssetConfig> {
        let cfg = self.get(asset)?;
        if !cfg.enabled {
            return Err(HubError::AssetDisabled(asset));
        }
        Ok(cfg)
    }

    /// Resolve a companion-domain token to its hub asset.
    pub fn resolve(&self, domain: DomainId, token: Address) -> Result<Address> {
        self.companions
            .get(&(domain, token))
            .copied()
            .ok_or(HubError::UnsupportedToken { domain, token })
    }

    /// Registered and enabled assets, in address order.
    pub fn enabled_assets(&self) -> impl Iterator<Item = &AssetConfig> {
        self.assets.values().filter(|cfg| cfg.enabled)
    }

    /// All registered assets, in address order.
    pub fn assets(&self) -> impl Iterator<Item = &AssetConfig> {
        self.assets.values()
    }

    /// Number of registered assets, enabled or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
