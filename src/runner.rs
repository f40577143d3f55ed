//! Agent runner
//!
//! One cycle at a time: fetch market history, ask the forecast model for a
//! signal, turn it into a trade intent, run it through the trade pipeline and
//! report the result. Then wait for the next tick.

use crate::config::{Config, PriceSource, QuoteSource, RpcConfig, TradingConfig};
use crate::guardrails::{
    AuditLog, GuardrailEngine, InMemoryVolumeStore, OnchainWhitelist, PolicyDecision,
    WhitelistOracle, WhitelistPolicy,
};
use crate::oracle::{PriceOracle, RegistryPriceOracle};
use crate::pipeline::{TradeOutcome, TradePipeline};
use crate::swap::{FixedHaircutEstimator, QuoteEstimator, SwapExecutor};
use crate::tokens::{registry, MAX_DECIMALS};
use crate::tools::{
    CycleReport, ForecastClient, LeaderboardReporter, MarketDataClient, OdosTool, PricePoint,
    ReportOutcome,
};
use crate::trade::{Signal, TradeIntent};
use crate::wallet::{LocalKeyWalletProvider, SecureWallet};
use crate::{Error, Result};
use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Wait after a failed cycle before trying again
pub const FAILURE_BACKOFF: Duration = Duration::from_secs(30);

/// Source of recent price history
#[async_trait]
pub trait MarketFeed: Send + Sync {
    async fn price_history(&self) -> Result<Vec<PricePoint>>;
}

#[async_trait]
impl MarketFeed for MarketDataClient {
    async fn price_history(&self) -> Result<Vec<PricePoint>> {
        self.fetch_prices().await
    }
}

/// Source of trading signals
#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn signal(&self, history: &[PricePoint]) -> Result<Signal>;
}

#[async_trait]
impl SignalSource for ForecastClient {
    async fn signal(&self, history: &[PricePoint]) -> Result<Signal> {
        ForecastClient::signal(self, history).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Evaluate policy only, never sign
    pub dry_run: bool,
    /// Stop after a single cycle
    pub once: bool,
}

/// What a cycle did with its signal
#[derive(Debug, Clone)]
pub enum CycleAction {
    Hold,
    Previewed(PolicyDecision),
    Traded(TradeOutcome),
}

#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub signal: Signal,
    pub action: CycleAction,
}

/// Agent runner that owns the trading loop
pub struct AgentRunner {
    trading: TradingConfig,
    agent_id: String,
    wallet_address: Address,
    pipeline: TradePipeline,
    market: Arc<dyn MarketFeed>,
    signals: Arc<dyn SignalSource>,
    reporter: Option<LeaderboardReporter>,
    options: RunOptions,
}

impl AgentRunner {
    pub fn new(
        config: &Config,
        wallet_address: Address,
        pipeline: TradePipeline,
        market: Arc<dyn MarketFeed>,
        signals: Arc<dyn SignalSource>,
        options: RunOptions,
    ) -> Self {
        Self {
            trading: config.trading.clone(),
            agent_id: config.endpoints.agent_id.clone(),
            wallet_address,
            pipeline,
            market,
            signals,
            reporter: None,
            options,
        }
    }

    pub fn with_reporter(mut self, reporter: LeaderboardReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Wire every collaborator from configuration.
    ///
    /// Live runs need a private key and a router address; dry runs only need
    /// a wallet address (configured, or derived from the key).
    pub fn from_config(
        config: &Config,
        private_key: Option<SecretString>,
        options: RunOptions,
    ) -> Result<Self> {
        let wallet_address = resolve_wallet_address(config, private_key.as_ref())?;
        let chain_id = config.execution.chain_id;
        let engine = build_engine(config, wallet_address)?;

        let pipeline = if options.dry_run {
            TradePipeline::preview_only(engine)
        } else {
            let key = private_key.ok_or_else(|| {
                Error::Config("PRIVATE_KEY is required unless running with --dry-run".to_string())
            })?;
            let rpc_url = RpcConfig::from_env(chain_id).url_for(chain_id)?;
            let wallets = Arc::new(LocalKeyWalletProvider::new(
                key,
                rpc_url,
                Duration::from_secs(config.execution.confirmation_timeout_secs),
            ));
            let quotes: Arc<dyn QuoteEstimator> = match config.execution.quote_source {
                QuoteSource::FixedHaircut => Arc::new(FixedHaircutEstimator::default()),
                QuoteSource::Odos => Arc::new(OdosTool::try_new(chain_id, wallet_address)?),
            };
            TradePipeline::new(SwapExecutor::new(
                &config.execution,
                engine,
                wallets,
                quotes,
            )?)
        };
        let pipeline = match &config.audit_log_path {
            Some(path) => pipeline.with_audit_log(Arc::new(AuditLog::new(path))),
            None => pipeline,
        };

        let endpoints = &config.endpoints;
        let market = Arc::new(MarketDataClient::new(
            endpoints.market_data_url.clone(),
            endpoints.market_coin_id.clone(),
            endpoints.market_history_days,
        )?);
        let forecast_url = endpoints
            .forecast_url
            .clone()
            .ok_or_else(|| Error::Config("FORECAST_URL is required to run the agent".to_string()))?;
        let signals = Arc::new(ForecastClient::new(forecast_url)?);

        let runner = Self::new(config, wallet_address, pipeline, market, signals, options);
        match &endpoints.leaderboard_url {
            Some(url) => Ok(runner.with_reporter(LeaderboardReporter::new(url.clone())?)),
            None => Ok(runner),
        }
    }

    /// Run until Ctrl-C (or after one cycle with `once`)
    pub async fn run(&self) -> Result<()> {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested, stopping after the current step");
                    let _ = tx.send(true);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                    // Hold the sender until the loop is gone
                    tx.closed().await;
                }
            }
        });
        self.run_until(rx).await
    }

    pub async fn run_until(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            wallet = %self.wallet_address,
            dry_run = self.options.dry_run,
            interval_secs = self.trading.check_interval_secs,
            "Starting trading loop"
        );

        let mut watching = true;
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            let cycle_id = Uuid::new_v4();
            let delay = match self.run_cycle(cycle_id, &shutdown).await {
                Ok(summary) => {
                    info!(%cycle_id, signal = %summary.signal, "Cycle complete");
                    if self.options.once {
                        return Ok(());
                    }
                    Duration::from_secs(self.trading.check_interval_secs)
                }
                Err(e) => {
                    error!(%cycle_id, error = %e, "Cycle failed");
                    if self.options.once {
                        return Err(e);
                    }
                    FAILURE_BACKOFF
                }
            };

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            tokio::select! {
                _ = &mut sleep => {}
                changed = shutdown.changed(), if watching => {
                    if changed.is_err() {
                        warn!("Shutdown channel closed, the loop can no longer be stopped");
                        watching = false;
                    } else if *shutdown.borrow() {
                        info!("Trading loop stopped");
                        return Ok(());
                    }
                    (&mut sleep).await;
                }
            }
        }
    }

    /// Market data, signal, decision, execution and report for one tick
    pub async fn run_cycle(
        &self,
        cycle_id: Uuid,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<CycleSummary> {
        let history = self.market.price_history().await?;
        info!(%cycle_id, points = history.len(), "Fetched market history");

        let signal = self.signals.signal(&history).await?;
        info!(%cycle_id, %signal, "Signal received");

        let stopping = *shutdown.borrow();
        let action = match decide(signal, &self.trading, self.wallet_address)? {
            None => CycleAction::Hold,
            Some(_) if stopping => {
                warn!(%cycle_id, "Shutdown requested, skipping trade");
                CycleAction::Hold
            }
            Some(intent) if self.options.dry_run => {
                let decision = self.pipeline.preview(&intent, Some(cycle_id)).await;
                info!(
                    %cycle_id,
                    valid = decision.is_valid(),
                    reason = ?decision.reason(),
                    "Dry run: trade evaluated, not executed"
                );
                CycleAction::Previewed(decision)
            }
            Some(intent) => {
                let outcome = self.pipeline.execute(&intent, Some(cycle_id)).await;
                match &outcome {
                    TradeOutcome::Rejected { decision } => {
                        warn!(%cycle_id, reason = ?decision.reason(), "Trade rejected");
                    }
                    TradeOutcome::Executed { result } if result.success => {
                        info!(%cycle_id, tx_hash = ?result.tx_hash, "Trade executed");
                    }
                    TradeOutcome::Executed { result } => {
                        warn!(%cycle_id, kind = ?result.error_kind(), "Trade failed");
                    }
                }
                CycleAction::Traded(outcome)
            }
        };

        let summary = CycleSummary {
            cycle_id,
            signal,
            action,
        };
        self.report(&summary);
        Ok(summary)
    }

    fn report(&self, summary: &CycleSummary) {
        let Some(reporter) = &self.reporter else {
            return;
        };

        let outcome = match &summary.action {
            CycleAction::Hold => None,
            CycleAction::Previewed(decision) => Some(ReportOutcome::Previewed {
                valid: decision.is_valid(),
            }),
            CycleAction::Traded(TradeOutcome::Rejected { decision }) => {
                Some(ReportOutcome::Rejected {
                    reason: decision
                        .reason()
                        .map(|kind| kind.to_string())
                        .unwrap_or_default(),
                })
            }
            CycleAction::Traded(TradeOutcome::Executed { result }) => {
                Some(ReportOutcome::Executed {
                    result: result.clone(),
                })
            }
        };

        // Fire-and-forget
        let _ = reporter.report(CycleReport {
            agent_id: self.agent_id.clone(),
            cycle_id: summary.cycle_id,
            timestamp: Utc::now(),
            signal: summary.signal,
            dry_run: self.options.dry_run,
            outcome,
        });
    }
}

/// Map a signal to a trade against the configured pair
pub fn decide(
    signal: Signal,
    trading: &TradingConfig,
    wallet_address: Address,
) -> Result<Option<TradeIntent>> {
    let (token_in, token_out, amount, explicit_decimals) = match signal {
        Signal::Hold => return Ok(None),
        Signal::Buy => (
            trading.quote_token,
            trading.base_token,
            trading.buy_amount()?,
            trading.quote_decimals,
        ),
        Signal::Sell => (
            trading.base_token,
            trading.quote_token,
            trading.sell_amount()?,
            trading.base_decimals,
        ),
    };

    let decimals = resolve_decimals(token_in, explicit_decimals)?;
    Ok(Some(TradeIntent::new(
        token_in,
        token_out,
        amount,
        decimals,
        trading.slippage_bps,
        wallet_address,
    )))
}

/// Configured decimals first, then the token registry
pub fn resolve_decimals(token: Address, explicit: Option<u8>) -> Result<u8> {
    let decimals = explicit
        .or_else(|| registry().decimals(&token))
        .ok_or_else(|| {
            Error::Config(format!(
                "Unknown decimals for token {}; set them in the trading config",
                token
            ))
        })?;
    if decimals > MAX_DECIMALS {
        return Err(Error::InvalidArgument(format!(
            "Decimals {} for token {} exceed {}",
            decimals, token, MAX_DECIMALS
        )));
    }
    Ok(decimals)
}

/// Policy engine wired from configuration
pub fn build_engine(config: &Config, wallet_address: Address) -> Result<Arc<GuardrailEngine>> {
    let chain_id = config.execution.chain_id;

    let prices: Arc<dyn PriceOracle> = match config.execution.price_source {
        PriceSource::Odos => Arc::new(OdosTool::try_new(chain_id, wallet_address)?),
        PriceSource::Registry => Arc::new(RegistryPriceOracle::default()),
    };

    let oracle: Option<Arc<dyn WhitelistOracle>> = match config.guardrails.whitelist_contract {
        Some(contract) => {
            let rpc_url = RpcConfig::from_env(chain_id).url_for(chain_id)?;
            Some(Arc::new(OnchainWhitelist::connect(contract, rpc_url)))
        }
        None => {
            warn!("WHITELIST_CONTRACT_ADDRESS not set, token allow-list check disabled");
            None
        }
    };
    let whitelist = WhitelistPolicy::from_oracle(oracle);

    Ok(Arc::new(GuardrailEngine::new(
        &config.guardrails,
        whitelist,
        prices,
        Arc::new(InMemoryVolumeStore::new()),
    )))
}

fn resolve_wallet_address(config: &Config, private_key: Option<&SecretString>) -> Result<Address> {
    let derived = private_key
        .map(|key| SecureWallet::from_secret(key).map(|wallet| wallet.address()))
        .transpose()?;

    match (config.wallet_address, derived) {
        (Some(configured), Some(derived)) if configured != derived => Err(Error::Config(format!(
            "WALLET_ADDRESS {} does not match the address of PRIVATE_KEY {}",
            configured, derived
        ))),
        (Some(address), _) | (None, Some(address)) => Ok(address),
        (None, None) => Err(Error::Config(
            "Set WALLET_ADDRESS or PRIVATE_KEY to identify the trading wallet".to_string(),
        )),
    }
}
