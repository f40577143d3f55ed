//! Signing wallet capability
//!
//! The swap executor depends only on [`SigningWallet`]; how the key is held
//! (local key, remote custody) stays behind [`WalletProvider`].

mod provider;
mod signer;

pub use provider::{LocalKeyWalletProvider, ProviderWallet};
pub use signer::SecureWallet;

use crate::Result;
use alloy::primitives::{Address, Log, B256, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::sync::Arc;

/// Mined transaction, reduced to what reconciliation needs
#[derive(Debug, Clone, PartialEq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    /// `false` when the transaction reverted
    pub success: bool,
    pub gas_used: u64,
    pub logs: Vec<Log>,
}

#[async_trait]
pub trait SigningWallet: Send + Sync {
    fn address(&self) -> Address;

    /// ERC-20 balance of this wallet
    async fn balance_of(&self, token: Address) -> Result<U256>;

    /// Sign and broadcast, returning the transaction hash
    async fn sign_and_send(&self, tx: TransactionRequest) -> Result<B256>;

    /// Wait for the transaction to be mined.
    ///
    /// Returns `Error::ConfirmationTimeout` when no receipt arrives in time.
    async fn confirm(&self, tx_hash: B256) -> Result<TxReceipt>;
}

/// Yields a signing handle for one swap
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn acquire(&self) -> Result<Arc<dyn SigningWallet>>;
}
