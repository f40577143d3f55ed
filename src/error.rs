//! Error types for the guardrail trading agent

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Price oracle error: {0}")]
    Oracle(String),

    #[error("Whitelist query failed: {0}")]
    Whitelist(String),

    #[error("Quote error: {0}")]
    Quote(String),

    #[error("Volume ledger error: {0}")]
    Ledger(String),

    #[error("Transaction {0} not confirmed before timeout")]
    ConfirmationTimeout(alloy::primitives::B256),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds surfaced through `PolicyDecision::reason` and `SwapFailure::kind`.
///
/// None of these are retried inside a pipeline run. The agent loop's fixed
/// backoff is the only recovery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Requested slippage is above the configured maximum or below the minimum.
    SlippageOutOfBounds,
    /// `token_in` and `token_out` are the same address.
    SelfSwapRejected,
    /// Zero input amount.
    InvalidAmount,
    /// A token is not on the allow-list, or the allow-list query failed.
    TokenNotWhitelisted,
    /// The trade would push the wallet past its daily USD volume.
    DailyVolumeExceeded,
    /// The signer holds less of `token_in` than the trade spends.
    InsufficientBalance,
    /// Wallet or client setup failed.
    InitializationError,
    /// Approval, quote, or swap transaction failed, reverted or timed out.
    ExecutionError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SlippageOutOfBounds => "SlippageOutOfBounds",
            ErrorKind::SelfSwapRejected => "SelfSwapRejected",
            ErrorKind::InvalidAmount => "InvalidAmount",
            ErrorKind::TokenNotWhitelisted => "TokenNotWhitelisted",
            ErrorKind::DailyVolumeExceeded => "DailyVolumeExceeded",
            ErrorKind::InsufficientBalance => "InsufficientBalance",
            ErrorKind::InitializationError => "InitializationError",
            ErrorKind::ExecutionError => "ExecutionError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_serializes_as_kind_name() {
        let value = serde_json::to_value(ErrorKind::DailyVolumeExceeded).unwrap();
        assert_eq!(value, serde_json::json!("DailyVolumeExceeded"));
        assert_eq!(ErrorKind::ExecutionError.to_string(), "ExecutionError");
    }
}
