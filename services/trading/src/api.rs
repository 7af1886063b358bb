//! # Trading API - Request-Facing Facade
//!
//! Thin translation layer between raw request values (integer ids, timeframe
//! strings, flags) and the typed core. Swap and deposit calls fold errors into
//! a user-facing result envelope; read paths return typed errors for the
//! transport layer to map. No pricing or settlement logic lives here.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use reefswap_amm::SwapMath;
use types::{AccountId, PoolId, Side, SwapRequest, TradeError, TradeRecord};

use crate::gateway::SettlementGateway;
use crate::history::{SortOrder, TradeHistoryStore};
use crate::orchestrator::TradeOrchestrator;
use crate::pool_state::PoolStateRepository;

/// Outcome envelope for swap and deposit calls
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapResult {
    pub success: bool,
    pub tx_ref: Option<String>,
    pub message: String,
}

impl SwapResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            tx_ref: None,
            message: message.into(),
        }
    }
}

/// Current spot pricing for a pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRate {
    /// Issued tokens per unit of base currency
    #[serde(with = "rust_decimal::serde::str")]
    pub rate: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub reserve_base: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub reserve_quote: Decimal,
}

/// Facade over the orchestrator and the read stores
pub struct TradingApi {
    orchestrator: Arc<TradeOrchestrator>,
    pools: Arc<PoolStateRepository>,
    gateway: Arc<dyn SettlementGateway>,
    history: Arc<TradeHistoryStore>,
}

impl TradingApi {
    pub fn new(
        orchestrator: Arc<TradeOrchestrator>,
        pools: Arc<PoolStateRepository>,
        gateway: Arc<dyn SettlementGateway>,
        history: Arc<TradeHistoryStore>,
    ) -> Self {
        Self {
            orchestrator,
            pools,
            gateway,
            history,
        }
    }

    /// Execute a swap for raw request values
    pub async fn swap(
        &self,
        account_id: u64,
        pool_id: u64,
        amount: Decimal,
        is_buy: bool,
    ) -> SwapResult {
        let account = match AccountId::new(account_id) {
            Ok(account) => account,
            Err(e) => return SwapResult::failure(format!("invalid account id: {e}")),
        };
        let pool = match PoolId::new(pool_id) {
            Ok(pool) => pool,
            Err(e) => return SwapResult::failure(format!("invalid pool id: {e}")),
        };
        let side = if is_buy { Side::Buy } else { Side::Sell };

        let request = SwapRequest {
            account,
            pool,
            side,
            amount,
        };
        match self.orchestrator.swap(request).await {
            Ok(order) => SwapResult {
                success: true,
                tx_ref: order.tx_ref.clone(),
                message: format!("{side} filled at {}", order.price),
            },
            Err(e) => {
                info!(pool_id, account_id, error = %e, "swap request failed");
                SwapResult::failure(e.to_string())
            }
        }
    }

    /// Deposit liquidity for raw request values
    pub async fn add_liquidity(
        &self,
        account_id: u64,
        pool_id: u64,
        base_amount: Decimal,
        quote_amount: Decimal,
    ) -> SwapResult {
        let account = match AccountId::new(account_id) {
            Ok(account) => account,
            Err(e) => return SwapResult::failure(format!("invalid account id: {e}")),
        };
        let pool = match PoolId::new(pool_id) {
            Ok(pool) => pool,
            Err(e) => return SwapResult::failure(format!("invalid pool id: {e}")),
        };

        match self
            .orchestrator
            .add_liquidity(account, pool, base_amount, quote_amount)
            .await
        {
            Ok(position) => SwapResult {
                success: true,
                tx_ref: Some(position.tx_ref),
                message: "liquidity deposit settled".into(),
            },
            Err(e) => SwapResult::failure(e.to_string()),
        }
    }

    /// Current spot rate from a live ledger snapshot, never the cache
    pub async fn exchange_rate(&self, pool_id: u64) -> Result<ExchangeRate, TradeError> {
        let pool_id = PoolId::new(pool_id).map_err(|e| TradeError::invalid_request(e.to_string()))?;
        let pool = self.pools.get(pool_id)?;
        let snapshot = self.gateway.amm_snapshot(&pool.asset).await?;

        let rate = SwapMath::spot_rate(snapshot.reserve_base, snapshot.reserve_quote)
            .map_err(|_| TradeError::IlliquidPool { pool: pool_id })?;
        Ok(ExchangeRate {
            rate,
            reserve_base: snapshot.reserve_base,
            reserve_quote: snapshot.reserve_quote,
        })
    }

    /// Trade history for a pool over a named timeframe (`1h`, `24h`, `7d`,
    /// `30d`); `None` applies the default
    pub fn trade_history(
        &self,
        pool_id: u64,
        timeframe: Option<&str>,
        ascending: bool,
    ) -> Result<Vec<TradeRecord>, TradeError> {
        let pool_id = PoolId::new(pool_id).map_err(|e| TradeError::invalid_request(e.to_string()))?;
        // Unknown pools read as empty history, but a malformed timeframe is a
        // caller bug worth surfacing
        let window = parse_timeframe(timeframe.unwrap_or(config::history::DEFAULT_TIMEFRAME))?;

        let order = if ascending {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        };
        Ok(self.history.query(pool_id, Utc::now() - window, order))
    }

    /// Most recent trades for a pool, newest first
    pub fn latest_trades(
        &self,
        pool_id: u64,
        limit: Option<usize>,
    ) -> Result<Vec<TradeRecord>, TradeError> {
        let pool_id = PoolId::new(pool_id).map_err(|e| TradeError::invalid_request(e.to_string()))?;
        Ok(self
            .history
            .latest(pool_id, limit.unwrap_or(config::history::DEFAULT_LATEST_LIMIT)))
    }
}

fn parse_timeframe(timeframe: &str) -> Result<Duration, TradeError> {
    match timeframe {
        "1h" => Ok(Duration::hours(1)),
        "24h" => Ok(Duration::hours(24)),
        "7d" => Ok(Duration::days(7)),
        "30d" => Ok(Duration::days(30)),
        other => Err(TradeError::invalid_request(format!(
            "unknown timeframe '{other}', expected 1h, 24h, 7d or 30d"
        ))),
    }
}
