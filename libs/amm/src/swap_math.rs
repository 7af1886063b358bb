//! Constant-product AMM math with exact calculations
//!
//! Preserves full precision using the Decimal type. The fee is retained on
//! the input leg: `effective_in = amount_in * (1 - fee/100000)`, then
//! `amount_out = effective_in * reserve_out / (reserve_in + effective_in)`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

/// Trading fee denominator: a fee of 500 is 0.5%
pub const FEE_SCALE: u32 = 100_000;

/// Errors from quote computation. All of these map to `InvalidQuoteInput`
/// at the orchestrator boundary except `InsufficientLiquidity`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// Trading fee outside [0, 100000). A configuration error, not a runtime
    /// input; callers must fail fast.
    #[error("trading fee {fee} outside [0, {FEE_SCALE})")]
    FeeOutOfRange { fee: u32 },

    #[error("input amount must be positive")]
    NonPositiveAmount,

    #[error("reserves must be positive")]
    NonPositiveReserves,

    /// Requested output meets or exceeds the available reserve
    #[error("insufficient liquidity: requested output exceeds reserve")]
    InsufficientLiquidity,
}

/// Constant-product math functions with zero precision loss
pub struct SwapMath;

impl SwapMath {
    /// Fee multiplier applied to the input leg: `1 - trading_fee / 100000`
    pub fn fee_multiplier(trading_fee: u32) -> Result<Decimal, QuoteError> {
        if trading_fee >= FEE_SCALE {
            return Err(QuoteError::FeeOutOfRange { fee: trading_fee });
        }
        Ok(Decimal::ONE - Decimal::from(trading_fee) / Decimal::from(FEE_SCALE))
    }

    /// Exact output amount for a given input using the x*y=k formula
    ///
    /// # Arguments
    /// * `amount_in` - input amount, strictly positive
    /// * `reserve_in` - reserve on the input side, strictly positive
    /// * `reserve_out` - reserve on the output side, strictly positive
    /// * `trading_fee` - fee at 1/100000 scale (500 = 0.5%)
    pub fn output_given_input(
        amount_in: Decimal,
        reserve_in: Decimal,
        reserve_out: Decimal,
        trading_fee: u32,
    ) -> Result<Decimal, QuoteError> {
        let fee_multiplier = Self::fee_multiplier(trading_fee)?;
        if amount_in <= Decimal::ZERO {
            return Err(QuoteError::NonPositiveAmount);
        }
        if reserve_in <= Decimal::ZERO || reserve_out <= Decimal::ZERO {
            return Err(QuoteError::NonPositiveReserves);
        }

        // (x + dx)(y - dy) = xy, with dx reduced by the fee
        let effective_in = amount_in * fee_multiplier;
        let numerator = effective_in * reserve_out;
        let denominator = reserve_in + effective_in;

        Ok(numerator / denominator)
    }

    /// Required input amount for a desired output (reverse calculation)
    ///
    /// Rounds up by one minimal unit so the computed input always suffices.
    pub fn input_given_output(
        amount_out: Decimal,
        reserve_in: Decimal,
        reserve_out: Decimal,
        trading_fee: u32,
    ) -> Result<Decimal, QuoteError> {
        let fee_multiplier = Self::fee_multiplier(trading_fee)?;
        if amount_out <= Decimal::ZERO {
            return Err(QuoteError::NonPositiveAmount);
        }
        if reserve_in <= Decimal::ZERO || reserve_out <= Decimal::ZERO {
            return Err(QuoteError::NonPositiveReserves);
        }
        if amount_out >= reserve_out {
            return Err(QuoteError::InsufficientLiquidity);
        }

        let numerator = reserve_in * amount_out;
        let denominator = (reserve_out - amount_out) * fee_multiplier;

        Ok(numerator / denominator + dec!(1))
    }

    /// Spot rate: quote-asset units per base-asset unit at current reserves
    pub fn spot_rate(reserve_base: Decimal, reserve_quote: Decimal) -> Result<Decimal, QuoteError> {
        if reserve_base <= Decimal::ZERO || reserve_quote <= Decimal::ZERO {
            return Err(QuoteError::NonPositiveReserves);
        }
        Ok(reserve_quote / reserve_base)
    }

    /// Price impact of a trade as a percentage of the pre-trade price
    pub fn price_impact(
        amount_in: Decimal,
        reserve_in: Decimal,
        reserve_out: Decimal,
    ) -> Result<Decimal, QuoteError> {
        if amount_in <= Decimal::ZERO {
            return Err(QuoteError::NonPositiveAmount);
        }
        if reserve_in <= Decimal::ZERO || reserve_out <= Decimal::ZERO {
            return Err(QuoteError::NonPositiveReserves);
        }

        let price_before = reserve_out / reserve_in;

        // Fee excluded: impact measures curve movement only
        let amount_out = Self::output_given_input(amount_in, reserve_in, reserve_out, 0)?;
        let price_after = (reserve_out - amount_out) / (reserve_in + amount_in);

        Ok((price_before - price_after).abs() / price_before * dec!(100))
    }
}
