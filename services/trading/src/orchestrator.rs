//! # Trade Orchestrator - Swap Execution State Machine
//!
//! ## Purpose
//!
//! Drives a swap through `Initiated → Quoted → Submitted → {Filled | Failed}`
//! and reconciles the outcome into the pool state repository and the trade
//! history store. `Ambiguous` submissions are parked, never guessed at: only
//! a reconciliation pass that re-queries the ledger may finalize them.
//!
//! ## Execution sequence
//!
//! ```text
//! SwapRequest → validate → claim pool → live reserve snapshot → quote
//!      ↓                                                          ↓
//! Failed(InvalidRequest)                        pending order + instruction
//!                                                                ↓
//!                 Filled ← finalize ← Accepted ← submit via gateway
//!                 Failed ←            Rejected ←
//!                 Ambiguous (reconcile later) ← Ambiguous ←
//! ```
//!
//! A `PoolContended` claim failure restarts the cycle from the top, up to a
//! bounded retry count with backoff. The claim is held across the whole
//! quote-and-settle sequence, so at most one settlement per pool is in
//! flight and the version checked by `apply_delta` cannot move underneath a
//! submission.
//!
//! Reserve deltas on fill are derived from the bound placed on the
//! instruction, the worst fill the account accepted. The cached reserves
//! intentionally track that worst case between fills; the per-swap ledger
//! refresh restores exact figures before every quote.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use reefswap_amm::{market_cap_estimate, BoundSide, QuoteError, SlippagePolicy, SwapMath};
use types::{
    AccountId, LiquidityPosition, Order, OrderId, OrderStatus, PoolId, Quote, Side, SwapRequest,
    TradeError, TradeRecord,
};

use crate::gateway::{
    DepositInstruction, SettlementGateway, SubmitOutcome, SwapInstruction, TxFate,
};
use crate::history::TradeHistoryStore;
use crate::orders::{OrderStore, PositionStore};
use crate::pool_state::PoolStateRepository;

/// Orchestrator tuning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Slippage tolerance and bound rounding
    pub slippage: SlippagePolicy,
    /// Bounded retries of the full cycle on pool contention
    pub max_pool_retries: u32,
    /// Base backoff between contention retries (milliseconds)
    pub retry_backoff_ms: u64,
    /// Factor for the derived market-cap estimate
    #[serde(with = "rust_decimal::serde::str")]
    pub market_cap_factor: Decimal,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            slippage: SlippagePolicy {
                tolerance: config::trading::SLIPPAGE_TOLERANCE,
                ..SlippagePolicy::default()
            },
            max_pool_retries: config::trading::MAX_POOL_RETRIES,
            retry_backoff_ms: config::trading::RETRY_BACKOFF_MS,
            market_cap_factor: config::trading::MARKET_CAP_FACTOR,
        }
    }
}

/// The swap/liquidity execution engine
pub struct TradeOrchestrator {
    gateway: Arc<dyn SettlementGateway>,
    pools: Arc<PoolStateRepository>,
    orders: Arc<OrderStore>,
    positions: Arc<PositionStore>,
    history: Arc<TradeHistoryStore>,
    config: OrchestratorConfig,
}

impl TradeOrchestrator {
    pub fn new(
        gateway: Arc<dyn SettlementGateway>,
        pools: Arc<PoolStateRepository>,
        orders: Arc<OrderStore>,
        positions: Arc<PositionStore>,
        history: Arc<TradeHistoryStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            gateway,
            pools,
            orders,
            positions,
            history,
            config,
        }
    }

    /// Execute a swap request end to end.
    ///
    /// Retries the whole cycle on pool contention, since the quote is only
    /// valid against the reserves it was computed from.
    pub async fn swap(&self, request: SwapRequest) -> Result<Order, TradeError> {
        if request.amount <= Decimal::ZERO {
            return Err(TradeError::invalid_request(format!(
                "swap amount must be positive, got {}",
                request.amount
            )));
        }

        let mut attempt = 0u32;
        loop {
            match self.try_swap(&request).await {
                Err(TradeError::PoolContended { pool }) if attempt < self.config.max_pool_retries => {
                    attempt += 1;
                    warn!(pool_id = %pool, attempt, "pool contended, retrying from quote");
                    tokio::time::sleep(Duration::from_millis(
                        self.config.retry_backoff_ms * u64::from(attempt),
                    ))
                    .await;
                }
                result => return result,
            }
        }
    }

    /// One full quote-and-settle cycle under an exclusive pool claim
    async fn try_swap(&self, request: &SwapRequest) -> Result<Order, TradeError> {
        let pool = self.pools.get(request.pool)?;
        if pool.halted {
            return Err(TradeError::PoolHalted { pool: pool.id });
        }

        let _claim = self.pools.try_claim(request.pool)?;

        // The ledger owns reserve truth; the repository is a cache refreshed
        // at least once per swap
        let snapshot = self.gateway.amm_snapshot(&pool.asset).await?;
        let pool = self.pools.refresh(
            pool.id,
            snapshot.reserve_base,
            snapshot.reserve_quote,
            snapshot.trading_fee,
            snapshot.lp_shares,
        )?;
        if !pool.is_liquid() {
            return Err(TradeError::IlliquidPool { pool: pool.id });
        }

        let quote = self.quote_swap(request, &pool)?;

        // Persist the pending record before anything leaves this process.
        // The stored price is implied by the instruction actually submitted,
        // so finalize and reconciliation derive deltas from executed amounts.
        let instruction_id = Uuid::new_v4();
        let instruction_price = quote.bound / request.amount;
        let order = self.orders.create_pending(
            request.account,
            request.pool,
            request.side,
            request.amount,
            instruction_price,
            instruction_id.to_string(),
        );

        let instruction = SwapInstruction {
            instruction_id,
            account: request.account,
            asset: pool.asset.clone(),
            side: request.side,
            amount_in: request.amount,
            bound_out: quote.bound,
        };
        info!(
            order_id = %order.id,
            pool_id = %pool.id,
            side = %request.side,
            amount_in = %request.amount,
            bound_out = %quote.bound,
            "submitting swap instruction"
        );

        match self.gateway.submit_swap(&instruction).await {
            Ok(SubmitOutcome::Accepted { tx_ref }) => self.finalize_fill(order.id, &tx_ref),
            Ok(SubmitOutcome::Rejected { reason }) => {
                let reason = reason.to_string();
                self.orders.mark_failed(order.id, reason.clone())?;
                info!(order_id = %order.id, reason = %reason, "swap rejected by ledger");
                Err(TradeError::GatewayRejected { reason })
            }
            Ok(SubmitOutcome::Ambiguous { reason }) => {
                self.orders.mark_ambiguous(order.id, reason.clone())?;
                warn!(order_id = %order.id, reason = %reason, "swap outcome ambiguous, parked for reconciliation");
                Err(TradeError::GatewayAmbiguous { reason })
            }
            Err(e) => {
                // The instruction never reached the ledger; safe to fail
                self.orders.mark_failed(order.id, e.to_string())?;
                Err(e)
            }
        }
    }

    /// Compute the quote and protective bound for a request against a pool
    fn quote_swap(&self, request: &SwapRequest, pool: &types::Pool) -> Result<Quote, TradeError> {
        let (reserve_in, reserve_out, bound_side) = match request.side {
            Side::Buy => (pool.reserve_base, pool.reserve_quote, BoundSide::Buy),
            Side::Sell => (pool.reserve_quote, pool.reserve_base, BoundSide::Sell),
        };

        let amount_out =
            SwapMath::output_given_input(request.amount, reserve_in, reserve_out, pool.trading_fee)
                .map_err(|e| map_quote_error(e, pool.id))?;
        let bound = self
            .config
            .slippage
            .bound(amount_out, bound_side)
            .map_err(|e| map_quote_error(e, pool.id))?;

        let fee_multiplier =
            SwapMath::fee_multiplier(pool.trading_fee).map_err(|e| map_quote_error(e, pool.id))?;
        Ok(Quote {
            side: request.side,
            amount_in: request.amount,
            amount_out,
            effective_price: amount_out / request.amount,
            fee_paid: request.amount * (Decimal::ONE - fee_multiplier),
            bound,
        })
    }

    /// Finalize a settlement the ledger confirmed. Idempotent by order id:
    /// replaying for any terminal order changes nothing and appends nothing.
    /// A failed order in particular must never be resurrected here; only the
    /// non-terminal states (pending, ambiguous) may move to filled.
    ///
    /// The caller must hold the pool's settlement claim.
    pub(crate) fn finalize_fill(&self, order_id: OrderId, tx_ref: &str) -> Result<Order, TradeError> {
        let order = self.orders.get(order_id)?;
        if order.status.is_terminal() {
            return Ok(order);
        }

        // Executed amounts are those placed in the instruction
        let amount_out = order.price * order.amount;
        let (base_delta, quote_delta) = match order.side {
            Side::Buy => (order.amount, -amount_out),
            Side::Sell => (-amount_out, order.amount),
        };

        // The settlement happened; record it before local bookkeeping that
        // may still fail
        let filled =
            self.orders
                .mark_filled(order_id, order.price, order.amount, tx_ref.to_string())?;
        self.history.append(TradeRecord {
            pool: order.pool,
            account: order.account,
            side: order.side,
            amount: order.amount,
            price: order.price,
            tx_ref: tx_ref.to_string(),
            timestamp: Utc::now(),
        });

        let pool = self.pools.get(order.pool)?;
        match self
            .pools
            .apply_delta(order.pool, base_delta, quote_delta, pool.version)
        {
            Ok(pool) => {
                self.update_market_cap(&pool);
                info!(
                    order_id = %order_id,
                    tx_ref = %tx_ref,
                    price = %order.price,
                    "swap filled"
                );
                Ok(filled)
            }
            Err(e) => {
                // Settlement is external truth; the order stays filled but the
                // pool is now suspect and (on underflow) halted by the repo
                error!(
                    order_id = %order_id,
                    error = %e,
                    "filled settlement could not be applied to pool state"
                );
                Err(e)
            }
        }
    }

    fn update_market_cap(&self, pool: &types::Pool) {
        match market_cap_estimate(
            pool.reserve_base,
            pool.reserve_quote,
            self.config.market_cap_factor,
        ) {
            Ok(cap) => {
                if let Err(e) = self.pools.set_market_cap(pool.id, cap) {
                    warn!(pool_id = %pool.id, error = %e, "failed to store market cap");
                }
            }
            Err(e) => warn!(pool_id = %pool.id, error = %e, "market cap estimate failed"),
        }
    }

    /// Reconcile one ambiguous order by re-querying the ledger for the
    /// instruction's fate. Terminal orders pass through unchanged; an order
    /// whose fate is still unknown stays ambiguous.
    pub async fn reconcile(&self, order_id: OrderId) -> Result<Order, TradeError> {
        let order = self.orders.get(order_id)?;
        if order.status.is_terminal() {
            return Ok(order);
        }
        if order.status != OrderStatus::Ambiguous {
            return Err(TradeError::invalid_request(format!(
                "order {order_id} is not awaiting reconciliation"
            )));
        }

        let instruction_ref = order
            .instruction_ref
            .as_deref()
            .ok_or_else(|| TradeError::invalid_request("order has no instruction reference"))?;
        let instruction_id = Uuid::parse_str(instruction_ref)
            .map_err(|_| TradeError::invalid_request("unparseable instruction reference"))?;

        match self.gateway.transaction_fate(instruction_id).await? {
            None => Err(TradeError::GatewayAmbiguous {
                reason: "ledger cannot yet determine instruction fate".into(),
            }),
            Some(TxFate::NotExecuted { reason }) => {
                info!(order_id = %order_id, reason = %reason, "ambiguous instruction did not execute");
                self.orders.mark_failed(order_id, reason)
            }
            Some(TxFate::Executed { tx_ref }) => {
                info!(order_id = %order_id, tx_ref = %tx_ref, "ambiguous instruction executed, finalizing");
                let _claim = self.pools.try_claim(order.pool)?;
                self.finalize_fill(order_id, &tx_ref)
            }
        }
    }

    /// Sweep all ambiguous orders once; returns how many reached a terminal
    /// state
    pub async fn reconcile_all(&self) -> usize {
        let mut resolved = 0;
        for order in self.orders.ambiguous() {
            match self.reconcile(order.id).await {
                Ok(order) if order.status.is_terminal() => resolved += 1,
                Ok(_) => {}
                Err(TradeError::GatewayAmbiguous { .. }) => {}
                Err(e) => warn!(order_id = %order.id, error = %e, "reconciliation attempt failed"),
            }
        }
        resolved
    }

    /// Deposit liquidity into a pool. Reserves grow on success and a
    /// position record is appended; there is no withdrawal path.
    pub async fn add_liquidity(
        &self,
        account: AccountId,
        pool_id: PoolId,
        base_amount: Decimal,
        quote_amount: Decimal,
    ) -> Result<LiquidityPosition, TradeError> {
        if base_amount <= Decimal::ZERO || quote_amount <= Decimal::ZERO {
            return Err(TradeError::invalid_request(
                "deposit amounts must be positive",
            ));
        }
        let pool = self.pools.get(pool_id)?;
        if pool.halted {
            return Err(TradeError::PoolHalted { pool: pool_id });
        }

        let _claim = self.pools.try_claim(pool_id)?;
        let pool = self.pools.get(pool_id)?;

        let instruction = DepositInstruction {
            instruction_id: Uuid::new_v4(),
            account,
            asset: pool.asset.clone(),
            base_amount,
            quote_amount,
        };
        info!(
            pool_id = %pool_id,
            account = %account,
            base = %base_amount,
            quote = %quote_amount,
            "submitting liquidity deposit"
        );

        match self.gateway.submit_deposit(&instruction).await? {
            SubmitOutcome::Accepted { tx_ref } => {
                self.pools
                    .apply_delta(pool_id, base_amount, quote_amount, pool.version)?;
                let position = LiquidityPosition {
                    account,
                    pool: pool_id,
                    base_amount,
                    quote_amount,
                    tx_ref,
                    created_at: Utc::now(),
                };
                self.positions.append(position.clone());
                info!(pool_id = %pool_id, account = %account, "liquidity deposit settled");
                Ok(position)
            }
            SubmitOutcome::Rejected { reason } => Err(TradeError::GatewayRejected {
                reason: reason.to_string(),
            }),
            // Share accounting is ledger-owned; the next per-swap refresh
            // restores truth, so an ambiguous deposit mutates nothing locally
            SubmitOutcome::Ambiguous { reason } => Err(TradeError::GatewayAmbiguous { reason }),
        }
    }
}

fn map_quote_error(error: QuoteError, pool: PoolId) -> TradeError {
    match error {
        QuoteError::InsufficientLiquidity => TradeError::IlliquidPool { pool },
        other => TradeError::InvalidQuoteInput {
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::MockGateway;
    use crate::gateway::{AmmSnapshot, RejectReason};
    use rust_decimal_macros::dec;
    use types::IssuedAsset;

    fn snapshot() -> AmmSnapshot {
        AmmSnapshot {
            reserve_base: dec!(1000000),
            reserve_quote: dec!(2000000000),
            trading_fee: 500,
            lp_shares: dec!(44721359),
        }
    }

    struct Fixture {
        gateway: Arc<MockGateway>,
        pools: Arc<PoolStateRepository>,
        orders: Arc<OrderStore>,
        positions: Arc<PositionStore>,
        history: Arc<TradeHistoryStore>,
        orchestrator: TradeOrchestrator,
        pool_id: PoolId,
    }

    fn fixture() -> Fixture {
        fixture_with_config(OrchestratorConfig {
            retry_backoff_ms: 1,
            ..OrchestratorConfig::default()
        })
    }

    fn fixture_with_config(config: OrchestratorConfig) -> Fixture {
        let gateway = Arc::new(MockGateway::with_snapshot(snapshot()));
        let pools = Arc::new(PoolStateRepository::new());
        let orders = Arc::new(OrderStore::new());
        let positions = Arc::new(PositionStore::new());
        let history = Arc::new(TradeHistoryStore::new());

        let pool_id = PoolId::new(1).unwrap();
        pools.insert(types::Pool::new(
            pool_id,
            IssuedAsset::new("SHRK", "rIssuer1"),
            dec!(1000000),
            dec!(2000000000),
            500,
        ));

        let orchestrator = TradeOrchestrator::new(
            gateway.clone(),
            pools.clone(),
            orders.clone(),
            positions.clone(),
            history.clone(),
            config,
        );
        Fixture {
            gateway,
            pools,
            orders,
            positions,
            history,
            orchestrator,
            pool_id,
        }
    }

    fn buy_request(fx: &Fixture, amount: Decimal) -> SwapRequest {
        SwapRequest {
            account: AccountId::new(7).unwrap(),
            pool: fx.pool_id,
            side: Side::Buy,
            amount,
        }
    }

    #[tokio::test]
    async fn test_buy_swap_fills_and_adjusts_reserves() {
        let fx = fixture();
        fx.gateway.push_swap_outcome(Ok(SubmitOutcome::Accepted {
            tx_ref: "TX1".into(),
        }));

        let order = fx.orchestrator.swap(buy_request(&fx, dec!(1000))).await.unwrap();

        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.tx_ref.as_deref(), Some("TX1"));
        // Bound: 1988021.918... * 1.01 rounded up to whole tokens
        assert_eq!(order.price, dec!(2007903) / dec!(1000));
        assert_eq!(order.filled_amount, Some(dec!(1000)));

        let pool = fx.pools.get(fx.pool_id).unwrap();
        assert_eq!(pool.reserve_base, dec!(1001000));
        assert_eq!(pool.reserve_quote, dec!(2000000000) - dec!(2007903));
        assert!(pool.market_cap > Decimal::ZERO);

        assert_eq!(fx.history.pool_count(fx.pool_id), 1);
        let latest = fx.history.latest(fx.pool_id, 10);
        assert_eq!(latest[0].tx_ref, "TX1");

        // The claim must be released after settlement
        assert!(fx.pools.try_claim(fx.pool_id).is_ok());
    }

    #[tokio::test]
    async fn test_sell_swap_moves_reserves_the_other_way() {
        let fx = fixture();
        fx.gateway.push_swap_outcome(Ok(SubmitOutcome::Accepted {
            tx_ref: "TX2".into(),
        }));

        let request = SwapRequest {
            account: AccountId::new(7).unwrap(),
            pool: fx.pool_id,
            side: Side::Sell,
            amount: dec!(1000000),
        };
        let order = fx.orchestrator.swap(request).await.unwrap();
        assert_eq!(order.status, OrderStatus::Filled);

        let pool = fx.pools.get(fx.pool_id).unwrap();
        // Sold tokens enter the quote reserve; base paid out leaves
        assert_eq!(pool.reserve_quote, dec!(2000000000) + dec!(1000000));
        assert!(pool.reserve_base < dec!(1000000));
    }

    #[tokio::test]
    async fn test_rejected_swap_leaves_reserves_unchanged() {
        let fx = fixture();
        fx.gateway.push_swap_outcome(Ok(SubmitOutcome::Rejected {
            reason: RejectReason::Refused("tecPATH_DRY".into()),
        }));

        let result = fx.orchestrator.swap(buy_request(&fx, dec!(1000))).await;
        assert!(matches!(result, Err(TradeError::GatewayRejected { .. })));

        let pool = fx.pools.get(fx.pool_id).unwrap();
        assert_eq!(pool.reserve_base, dec!(1000000));
        assert_eq!(pool.reserve_quote, dec!(2000000000));
        assert_eq!(fx.history.pool_count(fx.pool_id), 0);

        let order = fx.orders.get(OrderId::new(1).unwrap()).unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
        assert!(order.reason.as_deref().unwrap().contains("tecPATH_DRY"));
    }

    #[tokio::test]
    async fn test_ambiguous_swap_is_parked_not_resolved() {
        let fx = fixture();
        fx.gateway.push_swap_outcome(Ok(SubmitOutcome::Ambiguous {
            reason: "transport failure after send".into(),
        }));

        let result = fx.orchestrator.swap(buy_request(&fx, dec!(1000))).await;
        assert!(matches!(result, Err(TradeError::GatewayAmbiguous { .. })));

        let order = fx.orders.get(OrderId::new(1).unwrap()).unwrap();
        assert_eq!(order.status, OrderStatus::Ambiguous);

        // No reserve mutation, no history entry
        let pool = fx.pools.get(fx.pool_id).unwrap();
        assert_eq!(pool.reserve_base, dec!(1000000));
        assert_eq!(pool.reserve_quote, dec!(2000000000));
        assert_eq!(fx.history.pool_count(fx.pool_id), 0);
    }

    #[tokio::test]
    async fn test_reconcile_executed_instruction_fills() {
        let fx = fixture();
        fx.gateway.push_swap_outcome(Ok(SubmitOutcome::Ambiguous {
            reason: "timeout".into(),
        }));
        let _ = fx.orchestrator.swap(buy_request(&fx, dec!(1000))).await;

        let submitted = fx.gateway.submitted_swaps.lock()[0].clone();
        fx.gateway.set_fate(
            submitted.instruction_id,
            TxFate::Executed {
                tx_ref: "TX7".into(),
            },
        );

        let order = fx
            .orchestrator
            .reconcile(OrderId::new(1).unwrap())
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.tx_ref.as_deref(), Some("TX7"));

        let pool = fx.pools.get(fx.pool_id).unwrap();
        assert_eq!(pool.reserve_base, dec!(1001000));
        assert_eq!(fx.history.pool_count(fx.pool_id), 1);
    }

    #[tokio::test]
    async fn test_reconcile_unknown_fate_keeps_order_ambiguous() {
        let fx = fixture();
        fx.gateway.push_swap_outcome(Ok(SubmitOutcome::Ambiguous {
            reason: "timeout".into(),
        }));
        let _ = fx.orchestrator.swap(buy_request(&fx, dec!(1000))).await;

        let result = fx.orchestrator.reconcile(OrderId::new(1).unwrap()).await;
        assert!(matches!(result, Err(TradeError::GatewayAmbiguous { .. })));
        let order = fx.orders.get(OrderId::new(1).unwrap()).unwrap();
        assert_eq!(order.status, OrderStatus::Ambiguous);
        assert_eq!(fx.orchestrator.reconcile_all().await, 0);
    }

    #[tokio::test]
    async fn test_reconcile_not_executed_fails_without_mutation() {
        let fx = fixture();
        fx.gateway.push_swap_outcome(Ok(SubmitOutcome::Ambiguous {
            reason: "timeout".into(),
        }));
        let _ = fx.orchestrator.swap(buy_request(&fx, dec!(1000))).await;

        let submitted = fx.gateway.submitted_swaps.lock()[0].clone();
        fx.gateway.set_fate(
            submitted.instruction_id,
            TxFate::NotExecuted {
                reason: "expired".into(),
            },
        );

        assert_eq!(fx.orchestrator.reconcile_all().await, 1);
        let order = fx.orders.get(OrderId::new(1).unwrap()).unwrap();
        assert_eq!(order.status, OrderStatus::Failed);

        let pool = fx.pools.get(fx.pool_id).unwrap();
        assert_eq!(pool.reserve_base, dec!(1000000));
        assert_eq!(fx.history.pool_count(fx.pool_id), 0);
    }

    #[tokio::test]
    async fn test_finalize_replay_is_idempotent() {
        let fx = fixture();
        fx.gateway.push_swap_outcome(Ok(SubmitOutcome::Accepted {
            tx_ref: "TX1".into(),
        }));
        let order = fx.orchestrator.swap(buy_request(&fx, dec!(1000))).await.unwrap();
        let pool_after_fill = fx.pools.get(fx.pool_id).unwrap();

        // Replay the terminal transition for the same order id
        let replayed = fx.orchestrator.finalize_fill(order.id, "TX1").unwrap();
        assert_eq!(replayed, order);

        let pool = fx.pools.get(fx.pool_id).unwrap();
        assert_eq!(pool.reserve_base, pool_after_fill.reserve_base);
        assert_eq!(pool.reserve_quote, pool_after_fill.reserve_quote);
        assert_eq!(pool.version, pool_after_fill.version);
        assert_eq!(fx.history.pool_count(fx.pool_id), 1);
    }

    #[tokio::test]
    async fn test_finalize_on_failed_order_mutates_nothing() {
        let fx = fixture();
        fx.gateway.push_swap_outcome(Ok(SubmitOutcome::Rejected {
            reason: RejectReason::Refused("tecPATH_DRY".into()),
        }));
        let _ = fx.orchestrator.swap(buy_request(&fx, dec!(1000))).await;
        let before = fx.pools.get(fx.pool_id).unwrap();

        // Finalizing a failed order must not resurrect it, credit reserves,
        // or append history
        let order_id = OrderId::new(1).unwrap();
        let replayed = fx.orchestrator.finalize_fill(order_id, "TX-GHOST").unwrap();
        assert_eq!(replayed.status, OrderStatus::Failed);
        assert!(replayed.tx_ref.is_none());

        let after = fx.pools.get(fx.pool_id).unwrap();
        assert_eq!(after.reserve_base, before.reserve_base);
        assert_eq!(after.reserve_quote, before.reserve_quote);
        assert_eq!(after.version, before.version);
        assert_eq!(fx.history.pool_count(fx.pool_id), 0);
    }

    #[tokio::test]
    async fn test_contended_pool_surfaces_after_bounded_retries() {
        let fx = fixture_with_config(OrchestratorConfig {
            max_pool_retries: 2,
            retry_backoff_ms: 1,
            ..OrchestratorConfig::default()
        });

        let _held = fx.pools.try_claim(fx.pool_id).unwrap();
        let result = fx.orchestrator.swap(buy_request(&fx, dec!(1000))).await;
        assert_eq!(
            result,
            Err(TradeError::PoolContended { pool: fx.pool_id })
        );
        // Nothing was submitted and no order was created
        assert!(fx.gateway.submitted_swaps.lock().is_empty());
        assert_eq!(fx.orders.count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_swaps_serialize_per_pool() {
        let fx = fixture();
        fx.gateway.push_swap_outcome(Ok(SubmitOutcome::Accepted {
            tx_ref: "TX-A".into(),
        }));
        fx.gateway.push_swap_outcome(Ok(SubmitOutcome::Accepted {
            tx_ref: "TX-B".into(),
        }));

        let orchestrator = Arc::new(fx.orchestrator);
        let a = {
            let orchestrator = orchestrator.clone();
            let request = SwapRequest {
                account: AccountId::new(7).unwrap(),
                pool: fx.pool_id,
                side: Side::Buy,
                amount: dec!(1000),
            };
            tokio::spawn(async move { orchestrator.swap(request).await })
        };
        let b = {
            let orchestrator = orchestrator.clone();
            let request = SwapRequest {
                account: AccountId::new(8).unwrap(),
                pool: fx.pool_id,
                side: Side::Buy,
                amount: dec!(500),
            };
            tokio::spawn(async move { orchestrator.swap(request).await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(a.is_ok());
        assert!(b.is_ok());
        // Both settlements confirmed; both appear in history
        assert_eq!(fx.history.pool_count(fx.pool_id), 2);
    }

    #[tokio::test]
    async fn test_invalid_amount_fails_before_any_io() {
        let fx = fixture();
        let result = fx.orchestrator.swap(buy_request(&fx, dec!(0))).await;
        assert!(matches!(result, Err(TradeError::InvalidRequest { .. })));
        assert_eq!(fx.orders.count(), 0);
        assert!(fx.gateway.submitted_swaps.lock().is_empty());
    }

    #[tokio::test]
    async fn test_illiquid_pool_detected_from_live_snapshot() {
        let fx = fixture();
        fx.gateway.set_snapshot(Ok(AmmSnapshot {
            reserve_base: dec!(1000000),
            reserve_quote: dec!(0),
            trading_fee: 500,
            lp_shares: dec!(0),
        }));

        let result = fx.orchestrator.swap(buy_request(&fx, dec!(1000))).await;
        assert_eq!(
            result,
            Err(TradeError::IlliquidPool { pool: fx.pool_id })
        );
        assert!(fx.gateway.submitted_swaps.lock().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_unavailable_fails_the_order() {
        let fx = fixture();
        fx.gateway
            .push_swap_outcome(Err(TradeError::GatewayUnavailable {
                reason: "connect refused".into(),
            }));

        let result = fx.orchestrator.swap(buy_request(&fx, dec!(1000))).await;
        assert!(matches!(result, Err(TradeError::GatewayUnavailable { .. })));
        let order = fx.orders.get(OrderId::new(1).unwrap()).unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_deposit_grows_reserves_and_records_position() {
        let fx = fixture();
        fx.gateway.push_deposit_outcome(Ok(SubmitOutcome::Accepted {
            tx_ref: "TX-DEP".into(),
        }));

        let account = AccountId::new(7).unwrap();
        let position = fx
            .orchestrator
            .add_liquidity(account, fx.pool_id, dec!(100), dec!(200000))
            .await
            .unwrap();
        assert_eq!(position.tx_ref, "TX-DEP");

        let pool = fx.pools.get(fx.pool_id).unwrap();
        assert_eq!(pool.reserve_base, dec!(1000100));
        assert_eq!(pool.reserve_quote, dec!(2000200000));
        assert_eq!(fx.positions.for_account(account).len(), 1);
    }

    #[tokio::test]
    async fn test_ambiguous_deposit_mutates_nothing() {
        let fx = fixture();
        fx.gateway.push_deposit_outcome(Ok(SubmitOutcome::Ambiguous {
            reason: "timeout".into(),
        }));

        let account = AccountId::new(7).unwrap();
        let result = fx
            .orchestrator
            .add_liquidity(account, fx.pool_id, dec!(100), dec!(200000))
            .await;
        assert!(matches!(result, Err(TradeError::GatewayAmbiguous { .. })));

        let pool = fx.pools.get(fx.pool_id).unwrap();
        assert_eq!(pool.reserve_base, dec!(1000000));
        assert!(fx.positions.for_account(account).is_empty());
    }

    #[tokio::test]
    async fn test_fresh_instruction_id_per_attempt() {
        let fx = fixture();
        fx.gateway.push_swap_outcome(Ok(SubmitOutcome::Ambiguous {
            reason: "timeout".into(),
        }));
        fx.gateway.push_swap_outcome(Ok(SubmitOutcome::Accepted {
            tx_ref: "TX-RETRY".into(),
        }));

        let _ = fx.orchestrator.swap(buy_request(&fx, dec!(1000))).await;
        // Caller retries the request; a new instruction id must be minted
        let _ = fx.orchestrator.swap(buy_request(&fx, dec!(1000))).await;

        let submitted = fx.gateway.submitted_swaps.lock();
        assert_eq!(submitted.len(), 2);
        assert_ne!(submitted[0].instruction_id, submitted[1].instruction_id);
    }
}
