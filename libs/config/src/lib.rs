//! Shared configuration defaults
//!
//! Default values and constants used across reefswap services for
//! consistency. Runtime-tunable parameters live in each service's own config
//! struct; these are the shipped defaults they start from.

/// Settlement gateway defaults
pub mod gateway {
    /// Ledger JSON-RPC endpoint used when no override is configured
    pub const DEFAULT_LEDGER_URL: &str = "http://localhost:5005";

    /// Request timeout (milliseconds)
    pub const REQUEST_TIMEOUT_MS: u64 = 10_000;

    /// Submission timeout (milliseconds); expiry after send is ambiguity,
    /// not failure
    pub const SUBMIT_TIMEOUT_MS: u64 = 30_000;

    /// Idle connection keep-alive (seconds)
    pub const POOL_IDLE_TIMEOUT_SECS: u64 = 60;

    /// Concurrent connections kept per host
    pub const POOL_MAX_IDLE_PER_HOST: usize = 5;
}

/// Trading engine defaults
pub mod trading {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Slippage tolerance fraction (1%)
    pub const SLIPPAGE_TOLERANCE: Decimal = dec!(0.01);

    /// Default trading fee at 1/100000 scale (0.5%)
    pub const DEFAULT_TRADING_FEE: u32 = 500;

    /// Bounded retries of the quote-and-submit cycle on pool contention
    pub const MAX_POOL_RETRIES: u32 = 3;

    /// Base backoff between contention retries (milliseconds)
    pub const RETRY_BACKOFF_MS: u64 = 50;

    /// Market-cap estimate factor; provisional product logic, keep tunable
    pub const MARKET_CAP_FACTOR: Decimal = dec!(0.55);

    /// Seconds between reconciliation sweeps of ambiguous orders
    pub const RECONCILE_INTERVAL_SECS: u64 = 30;
}

/// Trade history defaults
pub mod history {
    /// Rows returned by the latest-orders view when unspecified
    pub const DEFAULT_LATEST_LIMIT: usize = 10;

    /// Timeframe applied when a query names none
    pub const DEFAULT_TIMEFRAME: &str = "24h";
}
