//! # Reefswap Trading Engine - AMM Trade Execution Core
//!
//! ## Purpose
//!
//! Quotes, executes, and records swaps and liquidity deposits against
//! constant-product pools, reconciling the external ledger's asynchronous
//! settlement with local pool-state bookkeeping. This is the subsystem with
//! the real invariants: conservation of value, fee accounting, ordering
//! between quote and settlement, and partial-failure recovery.
//!
//! ## Architecture Role
//!
//! ```text
//! SwapRequest → [Trade Orchestrator] → Settlement Gateway → External Ledger
//!       ↓              ↓                       ↓
//! Validation      Pricing Engine        Definitive/Ambiguous Outcome
//! Pool Claim      Slippage Bounds       Typed Classification
//!       ↓              ↓                       ↓
//! [Pool State Repository] ← reserve deltas ← [Finalize]
//! [Trade History Store]   ← confirmation-ordered appends
//! ```
//!
//! The HTTP/controller layer, wallet custody, and the ledger network itself
//! are external collaborators; this crate owns everything between a validated
//! request and a reconciled, persisted outcome.

pub mod api;
pub mod config;
pub mod gateway;
pub mod history;
pub mod orchestrator;
pub mod orders;
pub mod pool_state;

pub use api::{ExchangeRate, SwapResult, TradingApi};
pub use config::TradingConfig;
pub use gateway::{AmmSnapshot, LedgerClient, SettlementGateway, SubmitOutcome};
pub use orchestrator::TradeOrchestrator;
pub use pool_state::PoolStateRepository;
