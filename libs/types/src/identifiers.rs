//! Typed identifiers for pools, accounts, and orders
//!
//! Thin newtypes over `u64` so a pool id can never be passed where an account
//! id is expected. Zero is reserved as the null value and rejected at
//! construction.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Validated constructor; zero is the null id and is rejected
            pub fn new(value: u64) -> Result<Self, ValidationError> {
                if value == 0 {
                    return Err(ValidationError::NullId);
                }
                Ok(Self(value))
            }

            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<u64> for $name {
            type Error = ValidationError;

            fn try_from(value: u64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

define_id! {
    /// Identifies a liquidity pool (one per issued token pair)
    PoolId
}

define_id! {
    /// Identifies the account that owns a swap or liquidity position
    AccountId
}

define_id! {
    /// Identifies a persisted order record
    OrderId
}
