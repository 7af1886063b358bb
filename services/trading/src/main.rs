use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use trading_engine::config::TradingConfig;
use trading_engine::gateway::{LedgerClient, SettlementGateway};
use trading_engine::history::TradeHistoryStore;
use trading_engine::orchestrator::TradeOrchestrator;
use trading_engine::orders::{OrderStore, PositionStore};
use trading_engine::pool_state::PoolStateRepository;
use trading_engine::TradingApi;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("🚀 Starting Reefswap Trading Engine...");

    // Configuration: file if provided, otherwise environment overrides on
    // shipped defaults
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("📂 Loading configuration from {path}");
            TradingConfig::from_file(&path).context("failed to load configuration file")?
        }
        None => TradingConfig::from_env(),
    };
    config.validate().context("invalid configuration")?;
    info!(ledger_url = %config.gateway.ledger_url, "✅ Configuration validated");

    // Shared stores
    let pools = Arc::new(PoolStateRepository::new());
    let orders = Arc::new(OrderStore::new());
    let positions = Arc::new(PositionStore::new());
    let history = Arc::new(TradeHistoryStore::new());
    info!("✅ Pool, order and history stores initialized");

    // Settlement gateway over pooled HTTP
    let gateway: Arc<dyn SettlementGateway> = Arc::new(
        LedgerClient::new(config.gateway.clone()).context("failed to build ledger client")?,
    );
    info!("✅ Settlement gateway connected to ledger endpoint");

    let orchestrator = Arc::new(TradeOrchestrator::new(
        gateway.clone(),
        pools.clone(),
        orders.clone(),
        positions.clone(),
        history.clone(),
        config.orchestrator.clone(),
    ));
    let _api = TradingApi::new(
        orchestrator.clone(),
        pools.clone(),
        gateway.clone(),
        history.clone(),
    );
    info!("✅ Trade orchestrator and API facade initialized");

    // Background reconciliation of ambiguous orders
    let reconciler = orchestrator.clone();
    let interval_secs = config.reconcile_interval_secs;
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            let resolved = reconciler.reconcile_all().await;
            if resolved > 0 {
                info!(resolved, "reconciliation sweep finalized ambiguous orders");
            }
        }
    });
    info!("🔄 Reconciliation loop running every {interval_secs}s");

    info!("✅ Reefswap Trading Engine initialized successfully");
    info!("📊 Quoting constant-product swaps with slippage protection");
    info!("📡 Settling against external ledger at {}", config.gateway.ledger_url);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    warn!("shutdown signal received, stopping");

    Ok(())
}
