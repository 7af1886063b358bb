//! Swap requests, orders, trade history, and liquidity positions
//!
//! `Order` is the persistent record of an attempted swap (pending until the
//! settlement gateway returns a definitive outcome); `TradeRecord` is the
//! append-only history entry written once a swap fills. `Quote` is ephemeral
//! and recomputed per request, never persisted.

use crate::identifiers::{AccountId, OrderId, PoolId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction: buying the issued token with base currency, or selling it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order lifecycle status
///
/// `Ambiguous` is deliberately non-terminal: the instruction may or may not
/// have executed externally, and only a reconciliation pass that re-queries
/// the ledger is allowed to move it to `Filled` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Filled,
    Failed,
    Ambiguous,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Failed)
    }
}

/// A single swap request; consumed once by the orchestrator, never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub account: AccountId,
    pub pool: PoolId,
    pub side: Side,
    /// Requested amount: base currency when buying, issued token when selling
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

/// Ephemeral quote for one request. Lifetime = single request.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub side: Side,
    pub amount_in: Decimal,
    /// Raw constant-product output before the slippage bound
    pub amount_out: Decimal,
    /// Output per unit input at the quoted size
    pub effective_price: Decimal,
    /// Input retained by the pool as fee
    pub fee_paid: Decimal,
    /// Slippage-adjusted protective bound placed on the instruction
    pub bound: Decimal,
}

/// Persistent record of an attempted or completed swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account: AccountId,
    pub pool: PoolId,
    pub side: Side,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// Price implied by the submitted instruction; confirmed on fill
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_amount: Option<Decimal>,
    pub status: OrderStatus,
    /// External transaction reference, set once the ledger accepts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_ref: Option<String>,
    /// Instruction identifier of the last submission attempt; the handle a
    /// reconciliation pass uses to re-query an ambiguous outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_ref: Option<String>,
    /// Failure or ambiguity reason, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only trade history entry, written in settlement-confirmation order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub pool: PoolId,
    pub account: AccountId,
    pub side: Side,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub tx_ref: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-account record of a liquidity deposit; never mutated after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub account: AccountId,
    pub pool: PoolId,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub quote_amount: Decimal,
    pub tx_ref: String,
    pub created_at: DateTime<Utc>,
}
