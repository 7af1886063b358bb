//! # Order and Liquidity-Position Stores
//!
//! `OrderStore` owns the persistent swap records. Orders are created
//! `Pending` before submission and moved exactly once to a terminal state;
//! replaying a terminal transition for the same order id is a no-op, which is
//! what makes the orchestrator's finalize path idempotent. `Ambiguous` is
//! non-terminal and only a reconciliation pass may move it.
//!
//! `PositionStore` is the append-only record of liquidity deposits.

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use types::{
    AccountId, LiquidityPosition, Order, OrderId, OrderStatus, PoolId, Side, TradeError,
};

/// Thread-safe store for orders
pub struct OrderStore {
    orders: DashMap<OrderId, Order>,
    next_id: AtomicU64,
}

impl OrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Persist a pending order carrying the quoted price and the instruction
    /// reference of the submission attempt
    pub fn create_pending(
        &self,
        account: AccountId,
        pool: PoolId,
        side: Side,
        amount: Decimal,
        quoted_price: Decimal,
        instruction_ref: String,
    ) -> Order {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let order = Order {
            // Counter starts at 1, so the id is always constructible
            id: OrderId::new(id).expect("order ids start at 1"),
            account,
            pool,
            side,
            amount,
            price: quoted_price,
            filled_amount: None,
            status: OrderStatus::Pending,
            tx_ref: None,
            instruction_ref: Some(instruction_ref),
            reason: None,
            created_at: now,
            updated_at: now,
        };
        self.orders.insert(order.id, order.clone());
        debug!(order_id = %order.id, pool_id = %pool, side = %side, amount = %amount, "order created");
        order
    }

    pub fn get(&self, id: OrderId) -> Result<Order, TradeError> {
        self.orders
            .get(&id)
            .map(|o| o.clone())
            .ok_or(TradeError::OrderNotFound { order: id.value() })
    }

    /// Transition to `Filled`. Idempotent: an already-terminal order is
    /// returned unchanged.
    pub fn mark_filled(
        &self,
        id: OrderId,
        price: Decimal,
        filled_amount: Decimal,
        tx_ref: String,
    ) -> Result<Order, TradeError> {
        self.transition(id, |order| {
            order.status = OrderStatus::Filled;
            order.price = price;
            order.filled_amount = Some(filled_amount);
            order.tx_ref = Some(tx_ref);
            order.reason = None;
        })
    }

    /// Transition to `Failed`. Idempotent for terminal orders.
    pub fn mark_failed(&self, id: OrderId, reason: String) -> Result<Order, TradeError> {
        self.transition(id, |order| {
            order.status = OrderStatus::Failed;
            order.reason = Some(reason);
        })
    }

    /// Park a pending order as `Ambiguous` for out-of-band reconciliation
    pub fn mark_ambiguous(&self, id: OrderId, reason: String) -> Result<Order, TradeError> {
        self.transition(id, |order| {
            order.status = OrderStatus::Ambiguous;
            order.reason = Some(reason);
        })
    }

    /// Orders awaiting reconciliation
    pub fn ambiguous(&self) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|o| o.status == OrderStatus::Ambiguous)
            .map(|o| o.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.orders.len()
    }

    fn transition(
        &self,
        id: OrderId,
        apply: impl FnOnce(&mut Order),
    ) -> Result<Order, TradeError> {
        let mut entry = self
            .orders
            .get_mut(&id)
            .ok_or(TradeError::OrderNotFound { order: id.value() })?;

        // Terminal states are final; replays return the record as-is
        if entry.status.is_terminal() {
            return Ok(entry.clone());
        }
        apply(&mut entry);
        entry.updated_at = Utc::now();
        debug!(order_id = %id, status = ?entry.status, "order transitioned");
        Ok(entry.clone())
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only store of liquidity positions; no withdrawal path exists
pub struct PositionStore {
    by_account: DashMap<AccountId, Vec<LiquidityPosition>>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self {
            by_account: DashMap::new(),
        }
    }

    pub fn append(&self, position: LiquidityPosition) {
        debug!(
            account = %position.account,
            pool_id = %position.pool,
            base = %position.base_amount,
            quote = %position.quote_amount,
            "liquidity position recorded"
        );
        self.by_account
            .entry(position.account)
            .or_default()
            .push(position);
    }

    pub fn for_account(&self, account: AccountId) -> Vec<LiquidityPosition> {
        self.by_account
            .get(&account)
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

impl Default for PositionStore {
    fn default() -> Self {
        Self::new()
    }
}
