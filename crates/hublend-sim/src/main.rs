//! HubLend scenario runner.
//!
//! ```text
//! hublend-sim [sim-config.json]
//! ```
//!
//! Without an argument the built-in demo market (USDC + WETH) is used.
//! Set `RUST_LOG` to tune logging and `HUBLEND_LOG_JSON=1` for JSON logs.

mod scenario;
mod sim_config;

use std::sync::Arc;

use hublend_ledger::StaticPriceOracle;
use hublend_settlement::{DevProofVerifier, Hub};
use hublend_types::{Clock, ManualClock, Result, SystemClock};
use tracing_subscriber::EnvFilter;

use crate::sim_config::SimConfig;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("HUBLEND_LOG_JSON").is_ok_and(|v| v == "1");
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    init_tracing();

    let sim = match std::env::args().nth(1) {
        Some(path) => SimConfig::load(&path)?,
        None => SimConfig::demo(),
    };
    sim.validate()?;

    let clock = ManualClock::new(SystemClock.now());
    let oracle = Arc::new(StaticPriceOracle::new(sim.engine.max_price_age_secs));
    for asset in &sim.engine.assets {
        oracle.set_price(asset.asset, sim.price_of(&asset.symbol)?, clock.now())?;
    }
    let hub = Hub::new(
        sim.engine.clone(),
        oracle.clone(),
        Arc::new(clock.clone()),
        Box::new(DevProofVerifier),
    )?;

    let report = scenario::run(hub, &sim, &oracle, &clock)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
