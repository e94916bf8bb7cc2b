//! Simulator configuration: an engine config plus the market the scenario
//! runs in.

use std::{collections::BTreeMap, path::Path};

use hublend_types::{
    Address, AssetConfig, CompanionToken, DomainId, EngineConfig, HubError, RateModelParams,
    Result, RiskParams, constants::PRICE_SCALE,
};
use serde::{Deserialize, Serialize};

/// Simulator input, loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub engine: EngineConfig,
    /// Oracle quotes by asset symbol, in 1e8 units.
    pub prices_e8: BTreeMap<String, u128>,
    /// Asset the user borrows through a locked intent.
    pub borrow_symbol: String,
    /// Asset the user deposits as collateral through custody.
    pub collateral_symbol: String,
    pub relayer: Address,
}

impl SimConfig {
    /// Read a JSON config from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Validate the engine config plus the scenario fields.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        if self.borrow_symbol == self.collateral_symbol {
            return Err(HubError::InvalidConfig(
                "borrow and collateral assets must differ".into(),
            ));
        }
        self.asset(&self.borrow_symbol)?;
        self.asset(&self.collateral_symbol)?;
        for asset in &self.engine.assets {
            self.price_of(&asset.symbol)?;
        }
        if self.relayer == Address::ZERO {
            return Err(HubError::ZeroAddress { what: "relayer" });
        }
        Ok(())
    }

    /// The asset configured under `symbol`.
    pub fn asset(&self, symbol: &str) -> Result<&AssetConfig> {
        self.engine
            .assets
            .iter()
            .find(|a| a.symbol == symbol)
            .ok_or_else(|| HubError::InvalidConfig(format!("no asset with symbol {symbol}")))
    }

    /// Configured 1e8 price of `symbol`.
    pub fn price_of(&self, symbol: &str) -> Result<u128> {
        self.prices_e8
            .get(symbol)
            .copied()
            .ok_or_else(|| HubError::InvalidConfig(format!("no price for {symbol}")))
    }

    /// USDC at $1 and WETH at $2000 on hub domain 1, mirrored on domain 10.
    pub fn demo() -> Self {
        let hub = DomainId(1);
        let spoke = DomainId(10);
        let admin = Address::repeat_byte(0xa1);
        let mut engine = EngineConfig::new(hub, vec![spoke], admin);
        engine.settlement_operator = Address::repeat_byte(0xa2);
        engine.deposit_attester = Address::repeat_byte(0xa3);
        engine.assets = vec![
            demo_asset(0x01, "USDC", 6, spoke, 0x11),
            demo_asset(0x02, "WETH", 18, spoke, 0x12),
        ];
        Self {
            engine,
            prices_e8: BTreeMap::from([
                ("USDC".to_string(), PRICE_SCALE),
                ("WETH".to_string(), 2_000 * PRICE_SCALE),
            ]),
            borrow_symbol: "USDC".into(),
            collateral_symbol: "WETH".into(),
            relayer: Address::repeat_byte(0xb1),
        }
    }
}

fn demo_asset(byte: u8, symbol: &str, decimals: u8, spoke: DomainId, spoke_byte: u8) -> AssetConfig {
    AssetConfig {
        asset: Address::repeat_byte(byte),
        symbol: symbol.into(),
        decimals,
        companions: vec![CompanionToken {
            domain_id: spoke,
            token: Address::repeat_byte(spoke_byte),
        }],
        risk: RiskParams::default(),
        reserve_factor_bps: 1_000,
        rate_model: RateModelParams::default(),
        min_price_e8: PRICE_SCALE / 100,
        max_price_e8: 1_000_000 * PRICE_SCALE,
        enabled: true,
    }
}
