//! Alloy-provider backed signing wallet

use super::{SecureWallet, SigningWallet, TxReceipt, WalletProvider};
use crate::swap::router::IERC20;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Wallet that signs locally and talks to the chain over HTTP
pub struct ProviderWallet {
    address: Address,
    provider: DynProvider,
    confirmation_timeout: Duration,
}

impl ProviderWallet {
    pub fn connect(wallet: &SecureWallet, rpc_url: Url, confirmation_timeout: Duration) -> Self {
        let provider = ProviderBuilder::new()
            .wallet(wallet.wallet().clone())
            .connect_http(rpc_url)
            .erased();

        Self {
            address: wallet.address(),
            provider,
            confirmation_timeout,
        }
    }
}

#[async_trait]
impl SigningWallet for ProviderWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn balance_of(&self, token: Address) -> Result<U256> {
        let calldata = IERC20::balanceOfCall {
            account: self.address,
        }
        .abi_encode();
        let tx = TransactionRequest::default()
            .to(token)
            .input(Bytes::from(calldata).into());

        let result = self
            .provider
            .call(tx)
            .await
            .map_err(|e| Error::Rpc(format!("balanceOf({}) failed: {}", token, e)))?;

        if result.len() < 32 {
            return Err(Error::Rpc(format!(
                "balanceOf({}) returned {} bytes",
                token,
                result.len()
            )));
        }
        Ok(U256::from_be_slice(&result[..32]))
    }

    async fn sign_and_send(&self, tx: TransactionRequest) -> Result<B256> {
        let tx = tx.from(self.address);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| Error::Rpc(format!("Failed to send transaction: {}", e)))?;

        let tx_hash = *pending.tx_hash();
        tracing::debug!(tx_hash = %tx_hash, "Transaction broadcast");
        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: B256) -> Result<TxReceipt> {
        let deadline = Instant::now() + self.confirmation_timeout;

        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| Error::Rpc(format!("Failed to get receipt: {}", e)))?;

            if let Some(receipt) = receipt {
                let logs = receipt
                    .inner
                    .logs()
                    .iter()
                    .map(|log| log.inner.clone())
                    .collect();

                return Ok(TxReceipt {
                    tx_hash: receipt.transaction_hash,
                    success: receipt.status(),
                    gas_used: receipt.gas_used,
                    logs,
                });
            }

            if Instant::now() >= deadline {
                return Err(Error::ConfirmationTimeout(tx_hash));
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

impl std::fmt::Debug for ProviderWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderWallet")
            .field("address", &self.address)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .finish_non_exhaustive()
    }
}

/// Builds a [`ProviderWallet`] from a private key held in memory
pub struct LocalKeyWalletProvider {
    key: SecretString,
    rpc_url: Url,
    confirmation_timeout: Duration,
}

impl LocalKeyWalletProvider {
    pub fn new(key: SecretString, rpc_url: Url, confirmation_timeout: Duration) -> Self {
        Self {
            key,
            rpc_url,
            confirmation_timeout,
        }
    }
}

#[async_trait]
impl WalletProvider for LocalKeyWalletProvider {
    async fn acquire(&self) -> Result<Arc<dyn SigningWallet>> {
        let wallet = SecureWallet::from_secret(&self.key)?;
        tracing::debug!(address = %wallet.address(), "Signing wallet acquired");
        Ok(Arc::new(ProviderWallet::connect(
            &wallet,
            self.rpc_url.clone(),
            self.confirmation_timeout,
        )))
    }
}
