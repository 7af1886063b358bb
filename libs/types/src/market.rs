//! Pool and asset model
//!
//! A pool pairs the network-native base currency against one issued token.
//! Reserve figures held here are a cache of ledger truth; the version counter
//! is the optimistic-concurrency token for compare-and-update mutations.

use crate::identifiers::PoolId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An issued token, identified by currency code and issuer address.
/// The base asset (native currency) has no issuer and is implicit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssuedAsset {
    pub currency: String,
    pub issuer: String,
}

impl IssuedAsset {
    pub fn new(currency: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            issuer: issuer.into(),
        }
    }
}

impl fmt::Display for IssuedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.currency, self.issuer)
    }
}

/// Canonical state of one trading pool
///
/// Invariant: both reserves are strictly positive while the pool is active.
/// The product of reserves is non-decreasing across any completed swap
/// (modulo fee retention).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub asset: IssuedAsset,
    /// Native-currency reserve
    #[serde(with = "rust_decimal::serde::str")]
    pub reserve_base: Decimal,
    /// Issued-token reserve
    #[serde(with = "rust_decimal::serde::str")]
    pub reserve_quote: Decimal,
    /// Trading fee at 1/100000 scale (500 = 0.5%)
    pub trading_fee: u32,
    /// Total liquidity-share count
    #[serde(with = "rust_decimal::serde::str")]
    pub lp_shares: Decimal,
    /// Derived market-capitalization estimate; informational, not authoritative
    #[serde(with = "rust_decimal::serde::str")]
    pub market_cap: Decimal,
    /// Optimistic-concurrency version, bumped on every reserve mutation
    pub version: u64,
    /// Set after a reserve invariant violation; blocks further trades
    pub halted: bool,
}

impl Pool {
    pub fn new(id: PoolId, asset: IssuedAsset, reserve_base: Decimal, reserve_quote: Decimal, trading_fee: u32) -> Self {
        Self {
            id,
            asset,
            reserve_base,
            reserve_quote,
            trading_fee,
            lp_shares: Decimal::ZERO,
            market_cap: Decimal::ZERO,
            version: 1,
            halted: false,
        }
    }

    /// Whether both reserves are strictly positive
    pub fn is_liquid(&self) -> bool {
        self.reserve_base > Decimal::ZERO && self.reserve_quote > Decimal::ZERO
    }

    /// Constant-product value, `k = reserve_base * reserve_quote`
    pub fn invariant_product(&self) -> Decimal {
        self.reserve_base * self.reserve_quote
    }
}
