//! # Settlement Gateway - External Ledger Boundary
//!
//! ## Purpose
//!
//! Abstracts submission of trade and liquidity instructions to the external
//! ledger and classification of what came back. Ledger responses are parsed
//! into strict tagged variants here, at the boundary; loosely-typed JSON
//! never reaches the orchestrator.
//!
//! ## Outcome classification
//!
//! - `Accepted` — the ledger applied the instruction and returned a
//!   transaction reference
//! - `Rejected` — the ledger definitively refused; no retry as-is
//! - `Ambiguous` — timeout or partial acknowledgement after the instruction
//!   may have left this process. Never collapsed into `Rejected` (risks a
//!   double-submit) or `Accepted` (risks crediting an unexecuted trade).
//!
//! Connectivity failures *before* anything was sent map to
//! `GatewayUnavailable`, which is safe to retry with a fresh instruction id.
//! A prior instruction id is never resubmitted verbatim.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use types::{AccountId, IssuedAsset, Side, TradeError};

/// Read-only snapshot of a pool's AMM state on the ledger.
/// The ledger is the reserve source of truth; the local repository is a cache.
#[derive(Debug, Clone, PartialEq)]
pub struct AmmSnapshot {
    pub reserve_base: Decimal,
    pub reserve_quote: Decimal,
    /// Trading fee at 1/100000 scale
    pub trading_fee: u32,
    /// Outstanding liquidity-share count
    pub lp_shares: Decimal,
}

/// Why the ledger refused an instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The instruction itself was malformed; resubmitting it cannot succeed
    Malformed(String),
    /// The account lacks the funds the instruction commits
    InsufficientFunds(String),
    /// Any other definitive engine refusal
    Refused(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Malformed(code) => write!(f, "malformed instruction ({code})"),
            RejectReason::InsufficientFunds(code) => write!(f, "insufficient funds ({code})"),
            RejectReason::Refused(code) => write!(f, "refused ({code})"),
        }
    }
}

/// Result of submitting an instruction
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted { tx_ref: String },
    Rejected { reason: RejectReason },
    /// The instruction may or may not have been applied externally
    Ambiguous { reason: String },
}

/// Definitive fate of a previously ambiguous instruction
#[derive(Debug, Clone, PartialEq)]
pub enum TxFate {
    Executed { tx_ref: String },
    NotExecuted { reason: String },
}

/// A swap instruction. `instruction_id` is fresh per submission attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapInstruction {
    pub instruction_id: Uuid,
    pub account: AccountId,
    pub asset: IssuedAsset,
    pub side: Side,
    /// Amount given up: base currency on buys, issued token on sells
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_in: Decimal,
    /// Slippage-bounded amount on the receiving side
    #[serde(with = "rust_decimal::serde::str")]
    pub bound_out: Decimal,
}

/// A liquidity-deposit instruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositInstruction {
    pub instruction_id: Uuid,
    pub account: AccountId,
    pub asset: IssuedAsset,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub quote_amount: Decimal,
}

/// The external ledger as the orchestrator sees it.
///
/// Injected as `Arc<dyn SettlementGateway>` with explicit lifecycle so test
/// doubles can stand in for the network client.
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    /// Live reserves and fee for the pool trading `asset` against base
    async fn amm_snapshot(&self, asset: &IssuedAsset) -> Result<AmmSnapshot, TradeError>;

    /// Submit a swap and wait for a definitive or ambiguous result
    async fn submit_swap(&self, instruction: &SwapInstruction)
        -> Result<SubmitOutcome, TradeError>;

    /// Submit a liquidity deposit and wait for a definitive or ambiguous result
    async fn submit_deposit(
        &self,
        instruction: &DepositInstruction,
    ) -> Result<SubmitOutcome, TradeError>;

    /// Re-query the fate of an instruction whose outcome was ambiguous.
    /// `None` means the ledger still cannot say.
    async fn transaction_fate(&self, instruction_id: Uuid) -> Result<Option<TxFate>, TradeError>;
}

/// Classify a ledger engine-result code into a tagged outcome.
///
/// `tes*` applied, `tem*` malformed, `tec*` definitively refused with the
/// fee claimed, `ter*` queued locally with an unknown final outcome.
fn classify_engine_result(code: &str, tx_ref: Option<String>) -> SubmitOutcome {
    if code.starts_with("tes") {
        return match tx_ref {
            Some(tx_ref) => SubmitOutcome::Accepted { tx_ref },
            // Applied but no reference to reconcile against: treat as unknown
            None => SubmitOutcome::Ambiguous {
                reason: format!("{code} without transaction reference"),
            },
        };
    }
    if code.starts_with("tem") {
        return SubmitOutcome::Rejected {
            reason: RejectReason::Malformed(code.to_string()),
        };
    }
    if code.starts_with("ter") {
        return SubmitOutcome::Ambiguous {
            reason: format!("instruction queued ({code})"),
        };
    }
    if code.contains("UNFUNDED") || code.contains("INSUF") {
        return SubmitOutcome::Rejected {
            reason: RejectReason::InsufficientFunds(code.to_string()),
        };
    }
    SubmitOutcome::Rejected {
        reason: RejectReason::Refused(code.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC wire types. These stay private: the rest of the core only ever
// sees AmmSnapshot / SubmitOutcome / TxFate.
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RpcRequest<P: Serialize> {
    method: &'static str,
    params: [P; 1],
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct AmmInfoParamsEcho {
    amm: AmmInfoBody,
}

#[derive(Deserialize)]
struct AmmInfoBody {
    /// Base reserve as a decimal string
    amount: String,
    /// Issued-token reserve
    amount2: IssuedAmount,
    trading_fee: u32,
    lp_token: IssuedAmount,
}

#[derive(Deserialize)]
struct IssuedAmount {
    #[allow(dead_code)]
    currency: String,
    #[allow(dead_code)]
    issuer: String,
    value: String,
}

#[derive(Serialize)]
struct AmmInfoParams<'a> {
    asset: &'a IssuedAsset,
}

#[derive(Deserialize)]
struct SubmitBody {
    engine_result: String,
    #[serde(default)]
    tx_ref: Option<String>,
}

#[derive(Serialize)]
struct FateParams {
    instruction_id: Uuid,
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum FateBody {
    Executed {
        tx_ref: String,
    },
    NotExecuted {
        #[serde(default)]
        reason: String,
    },
    Unknown,
}

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Ledger JSON-RPC endpoint
    pub ledger_url: String,
    /// Timeout for read-only requests (milliseconds)
    pub request_timeout_ms: u64,
    /// Timeout for instruction submission (milliseconds). Expiry after send
    /// classifies as ambiguous, never as failure.
    pub submit_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            ledger_url: config::gateway::DEFAULT_LEDGER_URL.to_string(),
            request_timeout_ms: config::gateway::REQUEST_TIMEOUT_MS,
            submit_timeout_ms: config::gateway::SUBMIT_TIMEOUT_MS,
        }
    }
}

/// JSON-RPC settlement gateway over pooled HTTP
pub struct LedgerClient {
    config: GatewayConfig,
    http: reqwest::Client,
}

impl LedgerClient {
    /// Build the client with pooled, keep-alive connections
    pub fn new(config: GatewayConfig) -> Result<Self, TradeError> {
        let http = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(
                config::gateway::POOL_IDLE_TIMEOUT_SECS,
            ))
            .pool_max_idle_per_host(config::gateway::POOL_MAX_IDLE_PER_HOST)
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| TradeError::GatewayUnavailable {
                reason: format!("failed to build http client: {e}"),
            })?;

        Ok(Self { config, http })
    }

    async fn call<P: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        method: &'static str,
        params: P,
        timeout: Duration,
    ) -> Result<T, reqwest::Error> {
        let body = RpcRequest {
            method,
            params: [params],
        };
        let response = self
            .http
            .post(&self.config.ledger_url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let envelope: RpcResponse<T> = response.json().await?;
        Ok(envelope.result)
    }

    fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.config.request_timeout_ms)
    }

    fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.config.submit_timeout_ms)
    }

    /// Map a transport error on a read-only call. Reads are side-effect free,
    /// so everything is `GatewayUnavailable` and safely retryable.
    fn read_error(&self, context: &str, error: reqwest::Error) -> TradeError {
        TradeError::GatewayUnavailable {
            reason: format!("{context}: {error}"),
        }
    }

    /// Map a transport error on a submission. Only failures that provably
    /// happened before anything was sent are `GatewayUnavailable`; everything
    /// else is ambiguous because the instruction may have been applied.
    fn submit_error(&self, error: reqwest::Error) -> Result<SubmitOutcome, TradeError> {
        if error.is_connect() || error.is_builder() {
            return Err(TradeError::GatewayUnavailable {
                reason: format!("submit never left this process: {error}"),
            });
        }
        warn!(error = %error, "submission outcome unknown");
        Ok(SubmitOutcome::Ambiguous {
            reason: format!("transport failure after send: {error}"),
        })
    }

    fn parse_decimal(value: &str, field: &str) -> Result<Decimal, TradeError> {
        Decimal::from_str(value).map_err(|e| TradeError::GatewayUnavailable {
            reason: format!("ledger returned unparseable {field} '{value}': {e}"),
        })
    }
}

#[async_trait]
impl SettlementGateway for LedgerClient {
    async fn amm_snapshot(&self, asset: &IssuedAsset) -> Result<AmmSnapshot, TradeError> {
        let result: AmmInfoParamsEcho = self
            .call("amm_info", AmmInfoParams { asset }, self.read_timeout())
            .await
            .map_err(|e| self.read_error("amm_info", e))?;

        let amm = result.amm;
        let snapshot = AmmSnapshot {
            reserve_base: Self::parse_decimal(&amm.amount, "base reserve")?,
            reserve_quote: Self::parse_decimal(&amm.amount2.value, "quote reserve")?,
            trading_fee: amm.trading_fee,
            lp_shares: Self::parse_decimal(&amm.lp_token.value, "lp share count")?,
        };
        debug!(
            asset = %asset,
            reserve_base = %snapshot.reserve_base,
            reserve_quote = %snapshot.reserve_quote,
            trading_fee = snapshot.trading_fee,
            "fetched amm snapshot"
        );
        Ok(snapshot)
    }

    async fn submit_swap(
        &self,
        instruction: &SwapInstruction,
    ) -> Result<SubmitOutcome, TradeError> {
        let result: Result<SubmitBody, _> = self
            .call("submit", instruction, self.submit_timeout())
            .await;

        match result {
            Ok(body) => Ok(classify_engine_result(&body.engine_result, body.tx_ref)),
            Err(e) => self.submit_error(e),
        }
    }

    async fn submit_deposit(
        &self,
        instruction: &DepositInstruction,
    ) -> Result<SubmitOutcome, TradeError> {
        let result: Result<SubmitBody, _> = self
            .call("amm_deposit", instruction, self.submit_timeout())
            .await;

        match result {
            Ok(body) => Ok(classify_engine_result(&body.engine_result, body.tx_ref)),
            Err(e) => self.submit_error(e),
        }
    }

    async fn transaction_fate(&self, instruction_id: Uuid) -> Result<Option<TxFate>, TradeError> {
        let body: FateBody = self
            .call("tx", FateParams { instruction_id }, self.read_timeout())
            .await
            .map_err(|e| self.read_error("tx", e))?;

        Ok(match body {
            FateBody::Executed { tx_ref } => Some(TxFate::Executed { tx_ref }),
            FateBody::NotExecuted { reason } => Some(TxFate::NotExecuted { reason }),
            FateBody::Unknown => None,
        })
    }
}
