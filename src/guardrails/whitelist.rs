//! Token allow-list verification
//!
//! Two distinct trust states:
//! - no allow-list contract configured: the check is skipped (development mode)
//! - contract configured but the query fails: the trade is rejected

use crate::{Error, Result};
use alloy::primitives::{Address, Bytes};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

sol! {
    interface ITokenWhitelist {
        function isWhitelisted(address token) external view returns (bool);
    }
}

/// Read-only allow-list source
#[async_trait]
pub trait WhitelistOracle: Send + Sync {
    async fn is_whitelisted(&self, token: Address) -> Result<bool>;
}

/// Allow-list contract queried with `eth_call`
pub struct OnchainWhitelist {
    contract: Address,
    provider: DynProvider,
}

impl OnchainWhitelist {
    pub fn new(contract: Address, provider: DynProvider) -> Self {
        Self { contract, provider }
    }

    /// Connect a read-only HTTP provider
    pub fn connect(contract: Address, rpc_url: Url) -> Self {
        let provider = ProviderBuilder::new().connect_http(rpc_url).erased();
        Self::new(contract, provider)
    }
}

#[async_trait]
impl WhitelistOracle for OnchainWhitelist {
    async fn is_whitelisted(&self, token: Address) -> Result<bool> {
        let calldata = ITokenWhitelist::isWhitelistedCall { token }.abi_encode();
        let tx = TransactionRequest::default()
            .to(self.contract)
            .input(Bytes::from(calldata).into());

        let result = self
            .provider
            .call(tx)
            .await
            .map_err(|e| Error::Whitelist(format!("isWhitelisted({}) failed: {}", token, e)))?;

        decode_bool(&result)
    }
}

/// Decode an ABI-encoded `bool` return word
fn decode_bool(data: &[u8]) -> Result<bool> {
    if data.len() < 32 {
        return Err(Error::Whitelist(format!(
            "Expected 32-byte bool, got {} bytes",
            data.len()
        )));
    }
    let word = &data[..32];
    if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
        return Err(Error::Whitelist("Malformed bool return value".to_string()));
    }
    Ok(word[31] == 1)
}

/// Result of checking a token pair
#[derive(Debug, Clone, PartialEq)]
pub enum WhitelistOutcome {
    /// No allow-list configured
    Skipped,
    Approved,
    Rejected { token_in: bool, token_out: bool },
    /// The query errored; treated as not whitelisted
    QueryFailed(String),
}

/// How the policy engine treats the allow-list
#[derive(Clone)]
pub enum WhitelistPolicy {
    /// No contract configured: every pair passes
    Unconfigured,
    /// Both tokens must be on the list; query errors reject
    Enforced(Arc<dyn WhitelistOracle>),
}

impl WhitelistPolicy {
    pub fn from_oracle(oracle: Option<Arc<dyn WhitelistOracle>>) -> Self {
        match oracle {
            Some(oracle) => WhitelistPolicy::Enforced(oracle),
            None => WhitelistPolicy::Unconfigured,
        }
    }

    pub async fn verify(&self, token_in: Address, token_out: Address) -> WhitelistOutcome {
        let oracle = match self {
            WhitelistPolicy::Unconfigured => {
                tracing::debug!(
                    token_in = %token_in,
                    token_out = %token_out,
                    "Whitelist contract not configured, skipping allow-list check"
                );
                return WhitelistOutcome::Skipped;
            }
            WhitelistPolicy::Enforced(oracle) => oracle,
        };

        let in_listed = match oracle.is_whitelisted(token_in).await {
            Ok(listed) => listed,
            Err(e) => {
                tracing::warn!(token = %token_in, error = %e, "Whitelist query failed, failing closed");
                return WhitelistOutcome::QueryFailed(e.to_string());
            }
        };
        let out_listed = match oracle.is_whitelisted(token_out).await {
            Ok(listed) => listed,
            Err(e) => {
                tracing::warn!(token = %token_out, error = %e, "Whitelist query failed, failing closed");
                return WhitelistOutcome::QueryFailed(e.to_string());
            }
        };

        if in_listed && out_listed {
            tracing::debug!(token_in = %token_in, token_out = %token_out, "Whitelist check passed");
            WhitelistOutcome::Approved
        } else {
            WhitelistOutcome::Rejected {
                token_in: in_listed,
                token_out: out_listed,
            }
        }
    }
}

impl std::fmt::Debug for WhitelistPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WhitelistPolicy::Unconfigured => f.write_str("Unconfigured"),
            WhitelistPolicy::Enforced(_) => f.write_str("Enforced"),
        }
    }
}
