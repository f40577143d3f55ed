//! Trade intents, forecast signals and swap outcomes

use crate::ErrorKind;
use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A candidate trade, built once per cycle and consumed by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub token_in: Address,
    pub token_out: Address,
    /// Amount of `token_in` in its smallest unit
    pub amount_in: U256,
    /// Decimals of `token_in`, used to size the trade in USD
    pub token_in_decimals: u8,
    /// Slippage tolerance in basis points
    pub slippage_bps: u32,
    /// Signing wallet, also the swap recipient
    pub wallet_address: Address,
}

impl TradeIntent {
    pub fn new(
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        token_in_decimals: u8,
        slippage_bps: u32,
        wallet_address: Address,
    ) -> Self {
        Self {
            token_in,
            token_out,
            amount_in,
            token_in_decimals,
            slippage_bps,
            wallet_address,
        }
    }

    pub fn recipient(&self) -> Address {
        self.wallet_address
    }
}

/// Forecast signal returned by the model endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_matches('"').to_uppercase().as_str() {
            "BUY" => Ok(Signal::Buy),
            "SELL" => Ok(Signal::Sell),
            "HOLD" => Ok(Signal::Hold),
            other => Err(format!("unrecognized signal '{}'", other)),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

/// Progress of a single swap.
///
/// `Init → WalletReady → PolicyChecked → BalanceChecked → Approved → Submitted → Confirmed`.
/// A failure records the last stage that was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStage {
    Init,
    WalletReady,
    PolicyChecked,
    BalanceChecked,
    Approved,
    Submitted,
    Confirmed,
}

impl SwapStage {
    /// Whether the swap transaction may have reached the chain.
    pub fn swap_submitted(&self) -> bool {
        *self >= SwapStage::Submitted
    }
}

/// Why a swap failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapFailure {
    pub kind: ErrorKind,
    /// Last stage reached before the failure
    pub stage: SwapStage,
    pub message: String,
    /// Set once the swap transaction was sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<B256>,
}

impl SwapFailure {
    pub fn new(kind: ErrorKind, stage: SwapStage, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
            tx_hash: None,
        }
    }

    pub fn with_tx_hash(mut self, tx_hash: B256) -> Self {
        self.tx_hash = Some(tx_hash);
        self
    }
}

impl fmt::Display for SwapFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {:?}: {}", self.kind, self.stage, self.message)
    }
}

/// Outcome of `SwapExecutor::execute_swap`, owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResult {
    pub success: bool,
    pub stage: SwapStage,
    pub tx_hash: Option<B256>,
    /// Output actually received; zero when no matching transfer was found
    #[serde(with = "u256_decimal_opt")]
    pub amount_out: Option<U256>,
    #[serde(with = "u256_decimal_opt")]
    pub expected_out: Option<U256>,
    #[serde(with = "u256_decimal_opt")]
    pub min_amount_out: Option<U256>,
    pub gas_used: Option<u64>,
    /// `(expected - actual) / expected * 100`; negative when the fill beat the estimate
    pub effective_slippage: Option<f64>,
    pub error: Option<SwapFailure>,
    pub duration_ms: u64,
}

impl SwapResult {
    pub fn failed(failure: SwapFailure, duration_ms: u64) -> Self {
        Self {
            success: false,
            stage: failure.stage,
            tx_hash: failure.tx_hash,
            amount_out: None,
            expected_out: None,
            min_amount_out: None,
            gas_used: None,
            effective_slippage: None,
            error: Some(failure),
            duration_ms,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

/// Serialize raw token amounts as decimal strings, e.g. `"0"`.
mod u256_decimal_opt {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &Option<U256>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => s.serialize_some(&v.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<U256>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|raw| U256::from_str(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}
