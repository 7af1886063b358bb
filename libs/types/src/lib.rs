//! # Reefswap Types - Trading Core Domain Model
//!
//! ## Purpose
//!
//! Unified type system for the reefswap trade execution core: pool and order
//! identifiers, the pool/order/trade-history data model, and the error
//! taxonomy shared by the pricing engine, pool state repository, settlement
//! gateway, and trade orchestrator.
//!
//! ## Integration Points
//!
//! - **Consumers**: `reefswap-amm` (pricing), `trading-engine` (orchestration,
//!   stores, gateway), controller layers outside this core
//! - **Precision**: all monetary values are `rust_decimal::Decimal`; serialized
//!   representations are decimal strings, never binary floating point
//! - **Errors**: `TradeError` carries the full failure classification,
//!   including retryability, so callers never inspect message strings

pub mod error;
pub mod identifiers;
pub mod market;
pub mod trade;

pub use error::{TradeError, ValidationError};
pub use identifiers::{AccountId, OrderId, PoolId};
pub use market::{IssuedAsset, Pool};
pub use trade::{
    LiquidityPosition, Order, OrderStatus, Quote, Side, SwapRequest, TradeRecord,
};

/// Re-exported so downstream crates agree on the decimal type
pub use rust_decimal::Decimal;
