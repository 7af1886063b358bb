//! Error taxonomy for the trade execution core
//!
//! Every failure a public operation can surface is one of these kinds; the
//! orchestrator never lets an untyped error cross its boundary. Retryability
//! is part of the contract: `PoolContended` and `GatewayUnavailable` may be
//! retried (the latter only with a fresh instruction id), everything else is
//! terminal for the request.

use crate::identifiers::PoolId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from typed identifier construction
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// ID value is null/zero when non-null required
    #[error("ID cannot be null/zero")]
    NullId,
}

/// Failure classification for swap and liquidity operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TradeError {
    /// Request failed local validation; nothing was submitted
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Pricing engine rejected its inputs (non-positive amount or reserves,
    /// or a trading fee outside [0, 100000))
    #[error("invalid quote input: {reason}")]
    InvalidQuoteInput { reason: String },

    /// Pool reserves are degenerate; no quote can be computed
    #[error("pool {pool} has unusable reserves")]
    IlliquidPool { pool: PoolId },

    /// No pool with this id
    #[error("pool {pool} not found")]
    PoolNotFound { pool: PoolId },

    /// Another settlement holds the pool, or the pool state moved between
    /// quote and apply; bounded retry from the start of the cycle, then
    /// surface to the caller
    #[error("pool {pool} contended by a concurrent settlement")]
    PoolContended { pool: PoolId },

    /// Pool is blocked after an invariant violation; operator action required
    #[error("pool {pool} is halted pending reconciliation")]
    PoolHalted { pool: PoolId },

    /// External ledger refused the instruction; not retryable as-is
    #[error("ledger rejected instruction: {reason}")]
    GatewayRejected { reason: String },

    /// Instruction fate unknown (timeout or partial acknowledgement); must be
    /// reconciled, never resubmitted with the same instruction id
    #[error("instruction outcome unknown: {reason}")]
    GatewayAmbiguous { reason: String },

    /// Connectivity failure before the instruction reached the ledger;
    /// safe to retry with a fresh instruction id
    #[error("ledger unavailable: {reason}")]
    GatewayUnavailable { reason: String },

    /// Applying a delta would drive a reserve to zero or below. Fatal for the
    /// pool: indicates an internal bug or a quote against stale reserves.
    #[error("reserve underflow on pool {pool}: delta {delta} against reserve {reserve}")]
    ReserveUnderflow {
        pool: PoolId,
        reserve: Decimal,
        delta: Decimal,
    },

    /// Order lookup failed
    #[error("order {order} not found")]
    OrderNotFound { order: u64 },
}

impl TradeError {
    /// Whether a caller may retry the *request* (never the same instruction)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TradeError::PoolContended { .. } | TradeError::GatewayUnavailable { .. }
        )
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        TradeError::InvalidRequest {
            reason: reason.into(),
        }
    }
}
