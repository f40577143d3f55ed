//! Shared fixtures for unit tests

use crate::guardrails::{DailyVolumeRecord, VolumeStore, WhitelistOracle};
use crate::oracle::PriceOracle;
use crate::swap::router::IERC20;
use crate::swap::QuoteEstimator;
use crate::tokens::addresses;
use crate::trade::TradeIntent;
use crate::wallet::{SigningWallet, TxReceipt, WalletProvider};
use crate::{Error, Result};
use alloy::primitives::{address, Address, Log, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const WALLET: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
pub const ROUTER: Address = address!("e592427a0aece92de3edee1f18e0157c05861564");

pub fn addr(last: u8) -> Address {
    Address::with_last_byte(last)
}

/// Intent from `WALLET` at 50 bps
pub fn intent(token_in: Address, token_out: Address, amount_in: U256, decimals: u8) -> TradeIntent {
    TradeIntent::new(token_in, token_out, amount_in, decimals, 50, WALLET)
}

/// Spend `whole_usd` USDC for WETH
pub fn usdc_intent(whole_usd: u64) -> TradeIntent {
    intent(
        addresses::USDC_ETH,
        addresses::WETH_ETH,
        U256::from(whole_usd) * U256::from(1_000_000u64),
        6,
    )
}

pub fn transfer_log(token: Address, from: Address, to: Address, value: U256) -> Log {
    Log {
        address: token,
        data: IERC20::Transfer { from, to, value }.encode_log_data(),
    }
}

/// Audit log lines parsed back, skipping any that are not valid JSON
pub fn read_audit_entries(path: &Path) -> std::io::Result<Vec<serde_json::Value>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

pub struct MockPriceOracle {
    price: Option<f64>,
    calls: AtomicUsize,
}

impl MockPriceOracle {
    pub fn fixed(price: f64) -> Self {
        Self {
            price: Some(price),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            price: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for MockPriceOracle {
    async fn price_usd(&self, _token: Address) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.price
            .ok_or_else(|| Error::Oracle("price feed unavailable".to_string()))
    }
}

pub struct MockWhitelist {
    allowed: Option<HashSet<Address>>,
    calls: AtomicUsize,
}

impl MockWhitelist {
    pub fn allowing(tokens: &[Address]) -> Self {
        Self {
            allowed: Some(tokens.iter().copied().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            allowed: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WhitelistOracle for MockWhitelist {
    async fn is_whitelisted(&self, token: Address) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.allowed {
            Some(allowed) => Ok(allowed.contains(&token)),
            None => Err(Error::Whitelist("execution reverted".to_string())),
        }
    }
}

pub struct FailingQuoteEstimator;

#[async_trait]
impl QuoteEstimator for FailingQuoteEstimator {
    async fn expected_out(&self, _intent: &TradeIntent) -> Result<U256> {
        Err(Error::Quote("no route found".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

pub struct FailingVolumeStore;

#[async_trait]
impl VolumeStore for FailingVolumeStore {
    async fn load(&self, _wallet: Address, _date: NaiveDate) -> Result<Option<DailyVolumeRecord>> {
        Err(Error::Ledger("store offline".to_string()))
    }

    async fn store(&self, _wallet: Address, _record: DailyVolumeRecord) -> Result<()> {
        Err(Error::Ledger("store offline".to_string()))
    }

    async fn evict_before(&self, _cutoff: NaiveDate) -> Result<usize> {
        Err(Error::Ledger("store offline".to_string()))
    }
}

/// Scripted wallet. The n-th transaction sent (from 0) gets hash `n + 1`.
pub struct MockWallet {
    address: Address,
    balance: U256,
    logs: Vec<Log>,
    revert_at: Option<usize>,
    timeout_at: Option<usize>,
    fail_send_at: Option<usize>,
    attempts: AtomicUsize,
    sent: Mutex<Vec<TransactionRequest>>,
    balance_calls: AtomicUsize,
}

impl MockWallet {
    pub const GAS_USED: u64 = 150_000;

    pub fn new(address: Address, balance: U256) -> Self {
        Self {
            address,
            balance,
            logs: Vec::new(),
            revert_at: None,
            timeout_at: None,
            fail_send_at: None,
            attempts: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            balance_calls: AtomicUsize::new(0),
        }
    }

    /// Logs attached to every receipt
    pub fn with_logs(mut self, logs: Vec<Log>) -> Self {
        self.logs = logs;
        self
    }

    pub fn reverting_tx(mut self, index: usize) -> Self {
        self.revert_at = Some(index);
        self
    }

    pub fn timing_out_tx(mut self, index: usize) -> Self {
        self.timeout_at = Some(index);
        self
    }

    pub fn failing_send_at(mut self, index: usize) -> Self {
        self.fail_send_at = Some(index);
        self
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    fn index_of(hash: B256) -> usize {
        usize::from(hash.0[31]).saturating_sub(1)
    }
}

#[async_trait]
impl SigningWallet for MockWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn balance_of(&self, _token: Address) -> Result<U256> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance)
    }

    async fn sign_and_send(&self, tx: TransactionRequest) -> Result<B256> {
        let index = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_send_at == Some(index) {
            return Err(Error::Rpc("nonce too low".to_string()));
        }
        self.sent.lock().unwrap().push(tx);
        Ok(B256::with_last_byte(index as u8 + 1))
    }

    async fn confirm(&self, tx_hash: B256) -> Result<TxReceipt> {
        let index = Self::index_of(tx_hash);
        if self.timeout_at == Some(index) {
            return Err(Error::ConfirmationTimeout(tx_hash));
        }
        Ok(TxReceipt {
            tx_hash,
            success: self.revert_at != Some(index),
            gas_used: Self::GAS_USED,
            logs: self.logs.clone(),
        })
    }
}

pub struct MockWalletProvider {
    wallet: Arc<MockWallet>,
}

impl MockWalletProvider {
    pub fn new(wallet: Arc<MockWallet>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn acquire(&self) -> Result<Arc<dyn SigningWallet>> {
        Ok(self.wallet.clone())
    }
}

pub struct FailingWalletProvider;

#[async_trait]
impl WalletProvider for FailingWalletProvider {
    async fn acquire(&self) -> Result<Arc<dyn SigningWallet>> {
        Err(Error::Wallet("PRIVATE_KEY not set".to_string()))
    }
}
