use std::path::Path;
use std::sync::Arc;

use auth::ApiCredentials;
use common::{logging, WeexEnvironment};
use execution_core::Trader;
use metrics::create_metrics;
use rate_limit::{RateLimitConfig, RateLimiter};
use strategy_runner::{
    Engine, EngineConfig, EngineError, LiveTrader, MarketData, PaperTrader, TraderMode,
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use weex_rest::WeexRestClient;

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    let config = EngineConfig::from_env()?;

    let _log_guard = match &config.log_dir {
        Some(dir) => Some(common::init_logging_with_dir(Path::new(dir))?),
        None => {
            common::init_logging();
            None
        }
    };

    let environment = WeexEnvironment::from_env();
    info!(
        target: logging::INFO,
        environment = %environment,
        mode = %config.trader_mode,
        symbols = ?config.symbols,
        "starting weex-bot"
    );

    let credentials = match ApiCredentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) if config.trader_mode == TraderMode::Live => {
            error!(target: logging::ERROR, error = %e, "credentials missing");
            return Err(EngineError::MissingCredentials);
        }
        Err(e) => {
            warn!(target: logging::INFO, error = %e, "no credentials, account reads disabled");
            ApiCredentials::anonymous()
        }
    };

    let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        address_capacity: config.ip_capacity,
        account_capacity: config.uid_capacity,
        window: config.rate_window,
    }));
    let client = Arc::new(WeexRestClient::new(credentials, environment, limiter)?);

    if let Err(e) = client.sync_time().await {
        error!(target: logging::ERROR, error = %e, "server time sync failed, using local clock");
    }
    if client.has_credentials() {
        if let Err(e) = client.ping_private().await {
            error!(target: logging::ERROR, error = %e, "private API check failed");
        }
    }

    let trader: Arc<dyn Trader> = match config.trader_mode {
        TraderMode::Paper => Arc::new(PaperTrader::new(config.paper_fill_delay)),
        TraderMode::Live => Arc::new(LiveTrader::new(Arc::clone(&client))),
    };

    let metrics = create_metrics();
    let market: Arc<dyn MarketData> = client;
    let mut engine = Engine::new(config, market, trader, metrics.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(target: logging::INFO, "received Ctrl+C, initiating shutdown");
            let _ = shutdown_tx.send(true);
        }
    });

    engine.run(shutdown_rx).await;

    println!("\n{}", metrics.snapshot());
    info!(target: logging::INFO, "shutdown complete");
    Ok(())
}
