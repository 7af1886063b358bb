//! # Trading Engine Configuration
//!
//! ## Purpose
//!
//! Runtime parameter control for the trading engine without hardcoded values.
//! Supports JSON file loading, environment variable overrides, and validation
//! for the settlement gateway, the orchestrator, and the reconciliation loop.
//!
//! ## Integration Points
//!
//! - **Input Sources**: JSON configuration files, environment variables
//! - **Output Destinations**: `LedgerClient`, `TradeOrchestrator`, main loop
//! - **Default Management**: shipped defaults come from the shared `config`
//!   crate so every deployment starts from the same baseline

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::gateway::GatewayConfig;
use crate::orchestrator::OrchestratorConfig;

/// Complete configuration for the trading engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Settlement gateway connectivity
    pub gateway: GatewayConfig,
    /// Swap execution parameters
    pub orchestrator: OrchestratorConfig,
    /// Seconds between reconciliation sweeps of ambiguous orders
    pub reconcile_interval_secs: u64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            reconcile_interval_secs: config::trading::RECONCILE_INTERVAL_SECS,
        }
    }
}

impl TradingConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("REEFSWAP_LEDGER_URL") {
            config.gateway.ledger_url = url;
        }

        if let Ok(tolerance) = std::env::var("REEFSWAP_SLIPPAGE_TOLERANCE") {
            if let Ok(value) = Decimal::from_str(&tolerance) {
                config.orchestrator.slippage.tolerance = value;
            }
        }

        if let Ok(retries) = std::env::var("REEFSWAP_MAX_POOL_RETRIES") {
            if let Ok(value) = retries.parse::<u32>() {
                config.orchestrator.max_pool_retries = value;
            }
        }

        if let Ok(factor) = std::env::var("REEFSWAP_MARKET_CAP_FACTOR") {
            if let Ok(value) = Decimal::from_str(&factor) {
                config.orchestrator.market_cap_factor = value;
            }
        }

        if let Ok(interval) = std::env::var("REEFSWAP_RECONCILE_INTERVAL_SECS") {
            if let Ok(value) = interval.parse::<u64>() {
                config.reconcile_interval_secs = value;
            }
        }

        config
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.gateway.ledger_url.is_empty() {
            anyhow::bail!("ledger_url must not be empty");
        }

        if self.gateway.request_timeout_ms == 0 || self.gateway.submit_timeout_ms == 0 {
            anyhow::bail!("gateway timeouts must be positive");
        }

        let tolerance = self.orchestrator.slippage.tolerance;
        if tolerance < Decimal::ZERO || tolerance > Decimal::ONE {
            anyhow::bail!("slippage tolerance must be between 0 and 1 (100%)");
        }

        if self.orchestrator.market_cap_factor <= Decimal::ZERO {
            anyhow::bail!("market_cap_factor must be positive");
        }

        if self.reconcile_interval_secs == 0 {
            anyhow::bail!("reconcile_interval_secs must be positive");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_validates() {
        let config = TradingConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = TradingConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: TradingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("REEFSWAP_LEDGER_URL", "http://ledger.internal:5005");
        std::env::set_var("REEFSWAP_SLIPPAGE_TOLERANCE", "0.02");

        let config = TradingConfig::from_env();
        assert_eq!(config.gateway.ledger_url, "http://ledger.internal:5005");
        assert_eq!(config.orchestrator.slippage.tolerance, dec!(0.02));

        // Cleanup
        std::env::remove_var("REEFSWAP_LEDGER_URL");
        std::env::remove_var("REEFSWAP_SLIPPAGE_TOLERANCE");
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        let mut config = TradingConfig::default();
        config.orchestrator.slippage.tolerance = dec!(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_market_cap_factor_rejected() {
        let mut config = TradingConfig::default();
        config.orchestrator.market_cap_factor = Decimal::ZERO;
        assert!(config.validate().is_err());
    }
}
