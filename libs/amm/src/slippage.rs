//! Slippage-bounded protective limits
//!
//! The bound placed on a ledger instruction is the quoted output scaled by the
//! tolerance multiplier. Rounding direction is correctness-critical, not
//! cosmetic: the bound must always round in the direction that protects the
//! executing account. Buys round the issued-token bound up to whole units;
//! sells round the base-currency bound down to the base precision.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::swap_math::QuoteError;

/// Rounding side for a protective bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    /// Buying the issued token with base currency
    Buy,
    /// Selling the issued token for base currency
    Sell,
}

/// Slippage tolerance and the per-side rounding scales
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlippagePolicy {
    /// Tolerance as a fraction (0.01 = 1%)
    #[serde(with = "rust_decimal::serde::str")]
    pub tolerance: Decimal,
    /// Decimal places for the issued-token bound on buys
    pub buy_scale: u32,
    /// Decimal places for the base-currency bound on sells
    pub sell_scale: u32,
}

impl Default for SlippagePolicy {
    fn default() -> Self {
        Self {
            tolerance: dec!(0.01),
            buy_scale: 0,
            sell_scale: 3,
        }
    }
}

impl SlippagePolicy {
    /// Multiplier applied to the quoted output
    pub fn multiplier(&self) -> Decimal {
        Decimal::ONE + self.tolerance
    }

    /// Protective bound for the instruction, from the raw quoted output
    pub fn bound(&self, amount_out: Decimal, side: BoundSide) -> Result<Decimal, QuoteError> {
        if amount_out <= Decimal::ZERO {
            return Err(QuoteError::NonPositiveAmount);
        }
        let scaled = amount_out * self.multiplier();
        let bound = match side {
            BoundSide::Buy => {
                scaled.round_dp_with_strategy(self.buy_scale, RoundingStrategy::AwayFromZero)
            }
            BoundSide::Sell => {
                scaled.round_dp_with_strategy(self.sell_scale, RoundingStrategy::ToZero)
            }
        };
        Ok(bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tolerance_is_one_percent() {
        let policy = SlippagePolicy::default();
        assert_eq!(policy.multiplier(), dec!(1.01));
    }

    #[test]
    fn test_buy_bound_rounds_up_to_whole_tokens() {
        let policy = SlippagePolicy::default();
        // 1988021.918 * 1.01 = 2007902.137...
        let bound = policy.bound(dec!(1988021.918), BoundSide::Buy).unwrap();
        assert_eq!(bound, dec!(2007903));
    }

    #[test]
    fn test_sell_bound_rounds_down_to_base_precision() {
        let policy = SlippagePolicy::default();
        // 123.456789 * 1.01 = 124.69135689
        let bound = policy.bound(dec!(123.456789), BoundSide::Sell).unwrap();
        assert_eq!(bound, dec!(124.691));
    }

    #[test]
    fn test_bound_rejects_non_positive_output() {
        let policy = SlippagePolicy::default();
        assert_eq!(
            policy.bound(dec!(0), BoundSide::Buy),
            Err(QuoteError::NonPositiveAmount)
        );
    }

    #[test]
    fn test_rounding_never_meets_in_the_middle() {
        // The buy bound is never below the scaled value, the sell bound never above
        let policy = SlippagePolicy::default();
        let out = dec!(999.0001);
        let scaled = out * policy.multiplier();

        let buy = policy.bound(out, BoundSide::Buy).unwrap();
        let sell = policy.bound(out, BoundSide::Sell).unwrap();

        assert!(buy >= scaled);
        assert!(sell <= scaled);
    }
}
