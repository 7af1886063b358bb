//! # Reefswap AMM Library - Constant-Product Pricing Engine
//!
//! ## Purpose
//!
//! Pure mathematical library for automated-market-maker pricing: constant
//! product swap quotes with fee retention on the input leg, slippage-bounded
//! protective limits, spot rates, and the derived market-capitalization
//! estimate. Implements exact arithmetic with zero precision loss — reserve
//! and price magnitudes span many orders of magnitude and rounding errors
//! compound into real asset loss.
//!
//! ## Integration Points
//!
//! - **Input Sources**: live reserve snapshots from the settlement gateway,
//!   trade parameters from the orchestrator
//! - **Output Destinations**: the trade orchestrator (quotes and bounds) and
//!   the exchange-rate API (spot rates)
//! - **Precision**: `rust_decimal::Decimal` end to end, no binary floating
//!   point anywhere in a monetary path
//!
//! ## Architecture Role
//!
//! Deterministic leaf of the trading core: no I/O, no suspension, no side
//! effects. Every function is a pure computation over its arguments.

pub mod slippage;
pub mod swap_math;
pub mod valuation;

pub use slippage::{BoundSide, SlippagePolicy};
pub use swap_math::{QuoteError, SwapMath, FEE_SCALE};
pub use valuation::market_cap_estimate;

/// Common types for AMM calculations
pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;
