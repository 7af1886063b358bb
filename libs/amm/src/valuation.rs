//! Derived market-capitalization estimate
//!
//! The estimate is the pool's spot price in base currency scaled by a
//! configurable factor. The factor is provisional product logic with no
//! stated derivation, so it is a parameter rather than a constant baked in
//! here; the shipped default lives in the `config` crate.

use rust_decimal::Decimal;

use crate::swap_math::{QuoteError, SwapMath};

/// Market-cap estimate: `(reserve_base / reserve_quote) * factor`
///
/// Informational only; never used in trade math.
pub fn market_cap_estimate(
    reserve_base: Decimal,
    reserve_quote: Decimal,
    factor: Decimal,
) -> Result<Decimal, QuoteError> {
    // Price of one issued token in base currency
    let price_in_base = SwapMath::spot_rate(reserve_quote, reserve_base)?;
    Ok(price_in_base * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_cap_scales_with_factor() {
        // 1,000,000 base / 2,000,000,000 quote -> 0.0005 base per token
        let cap = market_cap_estimate(dec!(1000000), dec!(2000000000), dec!(0.55)).unwrap();
        assert_eq!(cap, dec!(0.000275));

        let double = market_cap_estimate(dec!(1000000), dec!(2000000000), dec!(1.10)).unwrap();
        assert_eq!(double, cap * dec!(2));
    }

    #[test]
    fn test_market_cap_rejects_empty_reserves() {
        assert_eq!(
            market_cap_estimate(dec!(0), dec!(2000000000), dec!(0.55)),
            Err(QuoteError::NonPositiveReserves)
        );
    }
}
