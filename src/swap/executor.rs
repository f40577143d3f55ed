//! Swap executor
//!
//! Turns an approved [`TradeIntent`] into an on-chain `exactInputSingle` swap:
//!
//! `Init → WalletReady → PolicyChecked → BalanceChecked → Approved → Submitted → Confirmed`
//!
//! Each step can fail into a typed [`SwapFailure`]; nothing is retried here.
//! Volume committed by the policy check is handed back whenever the swap
//! provably did not execute.

use super::approval::{ExactApproval, SpendApproval};
use super::quote::QuoteEstimator;
use super::router::{
    effective_slippage, exact_input_single_calldata, find_transfer_amount, min_amount_out,
    SwapParams,
};
use crate::config::{ExecutionConfig, FEE_TIERS};
use crate::guardrails::{GuardrailEngine, PolicyDecision};
use crate::trade::{SwapFailure, SwapResult, SwapStage, TradeIntent};
use crate::wallet::WalletProvider;
use crate::{Error, ErrorKind, Result};
use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

pub struct SwapExecutor {
    engine: Arc<GuardrailEngine>,
    wallets: Arc<dyn WalletProvider>,
    quotes: Arc<dyn QuoteEstimator>,
    approval: Arc<dyn SpendApproval>,
    router: Address,
    fee_tier: u32,
    deadline_secs: u64,
}

impl SwapExecutor {
    /// Fails when no router address is configured or the fee tier is unknown.
    pub fn new(
        config: &ExecutionConfig,
        engine: Arc<GuardrailEngine>,
        wallets: Arc<dyn WalletProvider>,
        quotes: Arc<dyn QuoteEstimator>,
    ) -> Result<Self> {
        let router = config
            .router_address
            .ok_or_else(|| Error::Config("SWAP_ROUTER_ADDRESS is required for swaps".to_string()))?;

        if !FEE_TIERS.contains(&config.fee_tier) {
            return Err(Error::Config(format!(
                "Unsupported fee tier {} (expected one of {:?})",
                config.fee_tier, FEE_TIERS
            )));
        }

        Ok(Self {
            engine,
            wallets,
            quotes,
            approval: Arc::new(ExactApproval),
            router,
            fee_tier: config.fee_tier,
            deadline_secs: config.deadline_secs,
        })
    }

    pub fn with_approval(mut self, approval: Arc<dyn SpendApproval>) -> Self {
        self.approval = approval;
        self
    }

    pub fn engine(&self) -> &Arc<GuardrailEngine> {
        &self.engine
    }

    /// Execute one swap. Expected failures come back as an unsuccessful result.
    pub async fn execute_swap(&self, intent: &TradeIntent) -> SwapResult {
        let started = Instant::now();
        match self.run(intent).await {
            Ok(mut result) => {
                result.duration_ms = elapsed_ms(started);
                result
            }
            Err(failure) => {
                tracing::warn!(
                    kind = %failure.kind,
                    stage = ?failure.stage,
                    error = %failure.message,
                    "Swap failed"
                );
                SwapResult::failed(failure, elapsed_ms(started))
            }
        }
    }

    async fn run(&self, intent: &TradeIntent) -> std::result::Result<SwapResult, SwapFailure> {
        let wallet = self.wallets.acquire().await.map_err(|e| {
            SwapFailure::new(
                ErrorKind::InitializationError,
                SwapStage::Init,
                format!("wallet acquisition failed: {}", e),
            )
        })?;
        if wallet.address() != intent.wallet_address {
            return Err(SwapFailure::new(
                ErrorKind::InitializationError,
                SwapStage::Init,
                format!(
                    "signer {} does not match intent wallet {}",
                    wallet.address(),
                    intent.wallet_address
                ),
            ));
        }
        tracing::info!(wallet = %wallet.address(), "Stage: wallet ready");

        // Re-validate; the intent may come from across a process boundary
        let decision = self.engine.validate(intent).await;
        if !decision.is_valid() {
            return Err(SwapFailure::new(
                decision.reason().unwrap_or(ErrorKind::ExecutionError),
                SwapStage::WalletReady,
                decision.message().unwrap_or("rejected by policy"),
            ));
        }
        tracing::info!("Stage: policy checked");

        let balance = match wallet.balance_of(intent.token_in).await {
            Ok(balance) => balance,
            Err(e) => {
                return Err(self
                    .abort(
                        &decision,
                        SwapFailure::new(
                            ErrorKind::ExecutionError,
                            SwapStage::PolicyChecked,
                            format!("balance read failed: {}", e),
                        ),
                    )
                    .await)
            }
        };
        if balance < intent.amount_in {
            return Err(self
                .abort(
                    &decision,
                    SwapFailure::new(
                        ErrorKind::InsufficientBalance,
                        SwapStage::PolicyChecked,
                        format!("balance {} < amountIn {}", balance, intent.amount_in),
                    ),
                )
                .await);
        }
        tracing::info!(%balance, "Stage: balance checked");

        if let Err(e) = self
            .approval
            .approve(wallet.as_ref(), intent.token_in, self.router, intent.amount_in)
            .await
        {
            return Err(self
                .abort(
                    &decision,
                    SwapFailure::new(
                        ErrorKind::ExecutionError,
                        SwapStage::BalanceChecked,
                        format!("approval failed: {}", e),
                    ),
                )
                .await);
        }
        tracing::info!(router = %self.router, "Stage: approved");

        let expected = match self.quotes.expected_out(intent).await {
            Ok(expected) => expected,
            Err(e) => {
                return Err(self
                    .abort(
                        &decision,
                        SwapFailure::new(
                            ErrorKind::ExecutionError,
                            SwapStage::Approved,
                            format!("quote failed: {}", e),
                        ),
                    )
                    .await)
            }
        };
        let min_out = min_amount_out(expected, intent.slippage_bps);
        tracing::debug!(
            estimator = self.quotes.name(),
            %expected,
            %min_out,
            slippage_bps = intent.slippage_bps,
            "Computed minimum output"
        );

        let params = SwapParams {
            token_in: intent.token_in,
            token_out: intent.token_out,
            fee: self.fee_tier,
            recipient: intent.recipient(),
            deadline: unix_now().saturating_add(self.deadline_secs),
            amount_in: intent.amount_in,
            amount_out_minimum: min_out,
        };
        let tx = TransactionRequest::default()
            .to(self.router)
            .input(exact_input_single_calldata(&params).into());

        let tx_hash = match wallet.sign_and_send(tx).await {
            Ok(hash) => hash,
            Err(e) => {
                return Err(self
                    .abort(
                        &decision,
                        SwapFailure::new(
                            ErrorKind::ExecutionError,
                            SwapStage::Approved,
                            format!("swap submission failed: {}", e),
                        ),
                    )
                    .await)
            }
        };
        tracing::info!(tx_hash = %tx_hash, "Stage: submitted");

        let receipt = match wallet.confirm(tx_hash).await {
            Ok(receipt) => receipt,
            Err(e) => {
                return Err(self
                    .abort(
                        &decision,
                        SwapFailure::new(
                            ErrorKind::ExecutionError,
                            SwapStage::Submitted,
                            format!("swap confirmation failed: {}", e),
                        )
                        .with_tx_hash(tx_hash),
                    )
                    .await)
            }
        };
        if !receipt.success {
            // Mined and reverted, so nothing was swapped
            self.engine.release(&decision).await;
            return Err(SwapFailure::new(
                ErrorKind::ExecutionError,
                SwapStage::Submitted,
                "swap transaction reverted",
            )
            .with_tx_hash(tx_hash));
        }

        let (amount_out, slippage) =
            match find_transfer_amount(&receipt.logs, intent.token_out, intent.recipient()) {
                Some(actual) => (actual, effective_slippage(expected, actual)),
                None => {
                    tracing::warn!(
                        tx_hash = %tx_hash,
                        token_out = %intent.token_out,
                        "No output transfer found in swap receipt, reporting amountOut 0"
                    );
                    (U256::ZERO, None)
                }
            };

        tracing::info!(
            tx_hash = %tx_hash,
            %amount_out,
            %expected,
            gas_used = receipt.gas_used,
            effective_slippage = ?slippage,
            "Stage: confirmed"
        );

        Ok(SwapResult {
            success: true,
            stage: SwapStage::Confirmed,
            tx_hash: Some(tx_hash),
            amount_out: Some(amount_out),
            expected_out: Some(expected),
            min_amount_out: Some(min_out),
            gas_used: Some(receipt.gas_used),
            effective_slippage: slippage,
            error: None,
            duration_ms: 0,
        })
    }

    /// Return the committed volume unless the swap may already be on chain
    async fn abort(&self, decision: &PolicyDecision, failure: SwapFailure) -> SwapFailure {
        if failure.stage.swap_submitted() {
            tracing::warn!(
                tx_hash = ?failure.tx_hash,
                "Swap outcome unknown, keeping committed volume"
            );
        } else {
            self.engine.release(decision).await;
        }
        failure
    }
}

fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExecutionConfig, GuardrailConfig};
    use crate::guardrails::{InMemoryVolumeStore, WhitelistPolicy};
    use crate::swap::quote::FixedHaircutEstimator;
    use crate::swap::router::ISwapRouter;
    use crate::test_support::{
        addr, transfer_log, usdc_intent, FailingQuoteEstimator, FailingWalletProvider,
        MockPriceOracle, MockWallet, MockWalletProvider, ROUTER, WALLET,
    };
    use crate::wallet::{SigningWallet, TxReceipt};
    use async_trait::async_trait;
    use crate::tokens::addresses;
    use alloy::sol_types::SolCall;
    use chrono::NaiveDate;

    fn execution_config() -> ExecutionConfig {
        ExecutionConfig {
            router_address: Some(ROUTER),
            ..ExecutionConfig::default()
        }
    }

    fn engine() -> Arc<GuardrailEngine> {
        Arc::new(GuardrailEngine::new(
            &GuardrailConfig::default(),
            WhitelistPolicy::Unconfigured,
            Arc::new(MockPriceOracle::fixed(1.0)),
            Arc::new(InMemoryVolumeStore::new()),
        ))
    }

    fn executor_with(wallet: Arc<MockWallet>) -> SwapExecutor {
        SwapExecutor::new(
            &execution_config(),
            engine(),
            Arc::new(MockWalletProvider::new(wallet)),
            Arc::new(FixedHaircutEstimator::default()),
        )
        .unwrap()
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    async fn committed(executor: &SwapExecutor) -> f64 {
        executor
            .engine()
            .ledger()
            .current(WALLET, today())
            .await
            .unwrap()
    }

    fn funded_wallet() -> MockWallet {
        MockWallet::new(WALLET, U256::from(1_000_000_000_000u64))
    }

    #[test]
    fn missing_router_is_a_config_error() {
        let result = SwapExecutor::new(
            &ExecutionConfig::default(),
            engine(),
            Arc::new(MockWalletProvider::new(Arc::new(funded_wallet()))),
            Arc::new(FixedHaircutEstimator::default()),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn unknown_fee_tier_is_a_config_error() {
        let config = ExecutionConfig {
            fee_tier: 2500,
            ..execution_config()
        };
        let result = SwapExecutor::new(
            &config,
            engine(),
            Arc::new(MockWalletProvider::new(Arc::new(funded_wallet()))),
            Arc::new(FixedHaircutEstimator::default()),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn successful_swap_reconciles_transfer() {
        let trade = usdc_intent(1);
        let wallet = Arc::new(funded_wallet().with_logs(vec![transfer_log(
            addresses::WETH_ETH,
            ROUTER,
            WALLET,
            U256::from(970_200u64),
        )]));
        let executor = executor_with(wallet.clone());

        let result = executor.execute_swap(&trade).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.stage, SwapStage::Confirmed);
        assert_eq!(result.expected_out, Some(U256::from(980_000u64)));
        // 980_000 * (10000 - 50) / 10000
        assert_eq!(result.min_amount_out, Some(U256::from(975_100u64)));
        assert_eq!(result.amount_out, Some(U256::from(970_200u64)));
        assert_eq!(result.gas_used, Some(MockWallet::GAS_USED));
        let slippage = result.effective_slippage.unwrap();
        assert!((slippage - 1.0).abs() < 1e-9);

        // approve then swap
        let sent = wallet.sent();
        assert_eq!(sent.len(), 2);
        let swap = ISwapRouter::exactInputSingleCall::abi_decode(sent[1].input.input().unwrap())
            .unwrap();
        assert_eq!(swap.params.amountIn, U256::from(1_000_000u64));
        assert_eq!(swap.params.amountOutMinimum, U256::from(975_100u64));
        assert_eq!(swap.params.recipient, WALLET);
        let deadline = swap.params.deadline.to::<u64>();
        assert!(deadline >= unix_now() + 590 && deadline <= unix_now() + 600);

        assert_eq!(committed(&executor).await, 1.0);
    }

    #[tokio::test]
    async fn missing_transfer_event_still_succeeds_with_zero_output() {
        let executor = executor_with(Arc::new(funded_wallet()));

        let result = executor.execute_swap(&usdc_intent(1)).await;

        assert!(result.success);
        assert_eq!(result.amount_out, Some(U256::ZERO));
        assert_eq!(result.effective_slippage, None);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["amountOut"], "0");
    }

    #[tokio::test]
    async fn policy_rejection_stops_before_chain_calls() {
        let wallet = Arc::new(funded_wallet());
        let executor = executor_with(wallet.clone());
        let mut trade = usdc_intent(1);
        trade.slippage_bps = 500;

        let result = executor.execute_swap(&trade).await;

        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(ErrorKind::SlippageOutOfBounds));
        assert_eq!(result.stage, SwapStage::WalletReady);
        assert_eq!(wallet.balance_calls(), 0);
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn insufficient_balance_releases_volume() {
        let wallet = Arc::new(MockWallet::new(WALLET, U256::from(10u64)));
        let executor = executor_with(wallet.clone());

        let result = executor.execute_swap(&usdc_intent(5)).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::InsufficientBalance));
        let message = &result.error.as_ref().unwrap().message;
        assert!(message.contains("10") && message.contains("5000000"));
        assert!(wallet.sent().is_empty());
        assert_eq!(committed(&executor).await, 0.0);
    }

    #[tokio::test]
    async fn wallet_acquisition_failure_is_initialization_error() {
        let executor = SwapExecutor::new(
            &execution_config(),
            engine(),
            Arc::new(FailingWalletProvider),
            Arc::new(FixedHaircutEstimator::default()),
        )
        .unwrap();

        let result = executor.execute_swap(&usdc_intent(1)).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::InitializationError));
        assert_eq!(result.stage, SwapStage::Init);
        assert_eq!(committed(&executor).await, 0.0);
    }

    #[tokio::test]
    async fn signer_mismatch_is_initialization_error() {
        let executor = executor_with(Arc::new(MockWallet::new(addr(0x42), U256::MAX)));

        let result = executor.execute_swap(&usdc_intent(1)).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::InitializationError));
    }

    #[tokio::test]
    async fn reverted_approval_releases_volume() {
        let wallet = Arc::new(funded_wallet().reverting_tx(0));
        let executor = executor_with(wallet.clone());

        let result = executor.execute_swap(&usdc_intent(1)).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::ExecutionError));
        assert_eq!(result.stage, SwapStage::BalanceChecked);
        assert_eq!(wallet.sent().len(), 1);
        assert_eq!(committed(&executor).await, 0.0);
    }

    #[tokio::test]
    async fn reverted_swap_reports_hash_and_releases_volume() {
        let executor = executor_with(Arc::new(funded_wallet().reverting_tx(1)));

        let result = executor.execute_swap(&usdc_intent(1)).await;

        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(ErrorKind::ExecutionError));
        assert_eq!(result.stage, SwapStage::Submitted);
        assert!(result.tx_hash.is_some());
        assert_eq!(committed(&executor).await, 0.0);
    }

    #[tokio::test]
    async fn confirmation_timeout_keeps_volume() {
        let executor = executor_with(Arc::new(funded_wallet().timing_out_tx(1)));

        let result = executor.execute_swap(&usdc_intent(1)).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::ExecutionError));
        assert_eq!(result.stage, SwapStage::Submitted);
        assert!(result.tx_hash.is_some());
        assert_eq!(committed(&executor).await, 1.0);
    }

    #[tokio::test]
    async fn submission_failure_releases_volume() {
        let executor = executor_with(Arc::new(funded_wallet().failing_send_at(1)));

        let result = executor.execute_swap(&usdc_intent(1)).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::ExecutionError));
        assert_eq!(result.stage, SwapStage::Approved);
        assert!(result.tx_hash.is_none());
        assert_eq!(committed(&executor).await, 0.0);
    }

    #[tokio::test]
    async fn quote_failure_releases_volume() {
        let wallet = Arc::new(funded_wallet());
        let executor = SwapExecutor::new(
            &execution_config(),
            engine(),
            Arc::new(MockWalletProvider::new(wallet.clone())),
            Arc::new(FailingQuoteEstimator),
        )
        .unwrap();

        let result = executor.execute_swap(&usdc_intent(1)).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::ExecutionError));
        assert_eq!(result.stage, SwapStage::Approved);
        assert!(result.tx_hash.is_none());
        // only the approval went out
        assert_eq!(wallet.sent().len(), 1);
        assert_eq!(committed(&executor).await, 0.0);
    }

    /// Allowance already granted out of band, e.g. by a signed permit
    struct PreApproved;

    #[async_trait]
    impl SpendApproval for PreApproved {
        async fn approve(
            &self,
            _wallet: &dyn SigningWallet,
            _token: Address,
            _spender: Address,
            _amount: U256,
        ) -> Result<Option<TxReceipt>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn substituted_approval_skips_approve_transaction() {
        let wallet = Arc::new(funded_wallet());
        let executor = executor_with(wallet.clone()).with_approval(Arc::new(PreApproved));

        let result = executor.execute_swap(&usdc_intent(1)).await;

        assert!(result.success, "{:?}", result.error);
        let sent = wallet.sent();
        assert_eq!(sent.len(), 1);
        let swap = ISwapRouter::exactInputSingleCall::abi_decode(sent[0].input.input().unwrap())
            .unwrap();
        assert_eq!(swap.params.amountIn, U256::from(1_000_000u64));
    }
}
