//! Token spend approval step
//!
//! Kept behind [`SpendApproval`] so a permit-based path can replace the
//! separate approve transaction without touching the executor.

use super::router::approve_calldata;
use crate::wallet::{SigningWallet, TxReceipt};
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

#[async_trait]
pub trait SpendApproval: Send + Sync {
    /// Allow `spender` to pull `amount` of `token` from the wallet.
    ///
    /// Returns the mined receipt when a transaction was needed.
    async fn approve(
        &self,
        wallet: &dyn SigningWallet,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<Option<TxReceipt>>;
}

/// Approve exactly the swap amount and wait for it to be mined
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactApproval;

#[async_trait]
impl SpendApproval for ExactApproval {
    async fn approve(
        &self,
        wallet: &dyn SigningWallet,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<Option<TxReceipt>> {
        let tx = TransactionRequest::default()
            .to(token)
            .input(approve_calldata(spender, amount).into());

        let tx_hash = wallet.sign_and_send(tx).await?;
        tracing::info!(tx_hash = %tx_hash, token = %token, %amount, "Approval submitted");

        let receipt = wallet.confirm(tx_hash).await?;
        if !receipt.success {
            return Err(Error::Rpc(format!("Approval {} reverted", tx_hash)));
        }

        tracing::info!(tx_hash = %tx_hash, gas_used = receipt.gas_used, "Approval confirmed");
        Ok(Some(receipt))
    }
}
