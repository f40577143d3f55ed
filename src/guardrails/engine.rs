//! Guardrail policy engine
//!
//! Every outbound swap passes through [`GuardrailEngine::validate`]. Checks run
//! in a fixed order and stop at the first failure:
//!
//! 1. slippage bounds
//! 2. self-swap
//! 3. zero amount
//! 4. token allow-list
//! 5. daily USD volume (commits to the ledger on success)
//!
//! Rejections come back as a [`PolicyDecision`] with an [`ErrorKind`] reason;
//! nothing in here returns an error to the caller.

use super::slippage_guard::SlippageGuard;
use super::volume_ledger::{VolumeCheck, VolumeLedger, VolumeStore};
use super::whitelist::{WhitelistOutcome, WhitelistPolicy};
use crate::config::GuardrailConfig;
use crate::oracle::PriceOracle;
use crate::tokens::{to_token_units, MAX_DECIMALS};
use crate::trade::TradeIntent;
use crate::ErrorKind;
use alloy::primitives::Address;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Price used to size a trade when the oracle cannot answer
pub const FALLBACK_PRICE_USD: f64 = 1.0;

/// Volume reserved by a successful `validate`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeCommit {
    pub wallet: Address,
    pub date: NaiveDate,
    pub amount_usd: f64,
}

/// Outcome of a policy check. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDecision {
    is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    details: Value,
    #[serde(skip)]
    commit: Option<VolumeCommit>,
}

impl PolicyDecision {
    fn approve(details: Value, commit: Option<VolumeCommit>) -> Self {
        Self {
            is_valid: true,
            reason: None,
            message: None,
            details,
            commit,
        }
    }

    fn reject(reason: ErrorKind, message: impl Into<String>, details: Value) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason),
            message: Some(message.into()),
            details,
            commit: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Set iff the decision is invalid
    pub fn reason(&self) -> Option<ErrorKind> {
        self.reason
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn details(&self) -> &Value {
        &self.details
    }

    /// Volume reserved by this decision, if it committed any
    pub fn commit(&self) -> Option<&VolumeCommit> {
        self.commit.as_ref()
    }
}

/// Price lookup result, after fallback
struct PricedTrade {
    price_usd: f64,
    price_source: &'static str,
    value_usd: f64,
}

pub struct GuardrailEngine {
    slippage: SlippageGuard,
    max_daily_volume_usd: f64,
    whitelist: WhitelistPolicy,
    prices: Arc<dyn PriceOracle>,
    ledger: VolumeLedger,
}

impl GuardrailEngine {
    pub fn new(
        config: &GuardrailConfig,
        whitelist: WhitelistPolicy,
        prices: Arc<dyn PriceOracle>,
        store: Arc<dyn VolumeStore>,
    ) -> Self {
        Self {
            slippage: SlippageGuard::new(config.min_slippage_bps, config.max_slippage_bps),
            max_daily_volume_usd: config.max_daily_volume_usd,
            whitelist,
            prices,
            ledger: VolumeLedger::new(store, config.volume_retention_days),
        }
    }

    pub fn ledger(&self) -> &VolumeLedger {
        &self.ledger
    }

    /// Validate and, when every check passes, commit the trade's USD value to today's volume.
    pub async fn validate(&self, intent: &TradeIntent) -> PolicyDecision {
        self.validate_on(intent, Utc::now().date_naive()).await
    }

    pub async fn validate_on(&self, intent: &TradeIntent, date: NaiveDate) -> PolicyDecision {
        self.check(intent, date, true).await
    }

    /// Run every check without touching the ledger
    pub async fn evaluate(&self, intent: &TradeIntent) -> PolicyDecision {
        self.evaluate_on(intent, Utc::now().date_naive()).await
    }

    pub async fn evaluate_on(&self, intent: &TradeIntent, date: NaiveDate) -> PolicyDecision {
        self.check(intent, date, false).await
    }

    /// Hand back volume reserved by `decision`
    pub async fn release(&self, decision: &PolicyDecision) {
        let Some(commit) = decision.commit() else {
            return;
        };
        if let Err(e) = self
            .ledger
            .release(commit.wallet, commit.date, commit.amount_usd)
            .await
        {
            tracing::error!(
                wallet = %commit.wallet,
                amount_usd = commit.amount_usd,
                error = %e,
                "Failed to release committed volume"
            );
        }
    }

    async fn check(&self, intent: &TradeIntent, date: NaiveDate, commit: bool) -> PolicyDecision {
        let decision = self.run_checks(intent, date, commit).await;
        if decision.is_valid() {
            tracing::debug!(
                wallet = %intent.wallet_address,
                token_in = %intent.token_in,
                token_out = %intent.token_out,
                committed = decision.commit.is_some(),
                "Trade passed guardrails"
            );
        } else {
            tracing::warn!(
                wallet = %intent.wallet_address,
                reason = ?decision.reason,
                detail = decision.message().unwrap_or_default(),
                "Trade rejected by guardrails"
            );
        }
        decision
    }

    async fn run_checks(&self, intent: &TradeIntent, date: NaiveDate, commit: bool) -> PolicyDecision {
        if let Err(violation) = self.slippage.check(intent.slippage_bps) {
            return PolicyDecision::reject(
                ErrorKind::SlippageOutOfBounds,
                violation.to_string(),
                json!({
                    "slippageBps": intent.slippage_bps,
                    "minSlippageBps": self.slippage.min_bps(),
                    "maxSlippageBps": self.slippage.max_bps(),
                }),
            );
        }

        // Address equality is byte equality, so checksum casing cannot bypass this
        if intent.token_in == intent.token_out {
            return PolicyDecision::reject(
                ErrorKind::SelfSwapRejected,
                "tokenIn and tokenOut are the same token",
                json!({ "token": intent.token_in.to_string() }),
            );
        }

        if intent.amount_in.is_zero() {
            return PolicyDecision::reject(
                ErrorKind::InvalidAmount,
                "amountIn must be positive",
                json!({ "amountIn": intent.amount_in.to_string() }),
            );
        }

        if intent.token_in_decimals > MAX_DECIMALS {
            return PolicyDecision::reject(
                ErrorKind::InvalidAmount,
                format!("tokenIn decimals must be at most {}", MAX_DECIMALS),
                json!({ "decimals": intent.token_in_decimals }),
            );
        }

        let whitelist = self.whitelist.verify(intent.token_in, intent.token_out).await;
        if let Some(decision) = whitelist_rejection(intent, &whitelist) {
            return decision;
        }
        let whitelist_status = match whitelist {
            WhitelistOutcome::Skipped => "skipped",
            _ => "approved",
        };

        let priced = self.price_trade(intent).await;
        let limit = self.max_daily_volume_usd;
        let wallet = intent.wallet_address;

        let check = if commit {
            self.ledger
                .try_commit(wallet, date, priced.value_usd, limit)
                .await
        } else {
            self.ledger.current(wallet, date).await.map(|current| {
                let new_total = current + priced.value_usd;
                if new_total > limit {
                    VolumeCheck::Exceeded { current, new_total }
                } else {
                    VolumeCheck::Committed {
                        previous: current,
                        new_total,
                    }
                }
            })
        };

        match check {
            Ok(VolumeCheck::Committed {
                previous,
                new_total,
            }) => PolicyDecision::approve(
                json!({
                    "tradeValueUsd": priced.value_usd,
                    "priceUsd": priced.price_usd,
                    "priceSource": priced.price_source,
                    "previousVolume": previous,
                    "newTotal": new_total,
                    "limit": limit,
                    "whitelist": whitelist_status,
                }),
                commit.then_some(VolumeCommit {
                    wallet,
                    date,
                    amount_usd: priced.value_usd,
                }),
            ),
            Ok(VolumeCheck::Exceeded { current, new_total }) => PolicyDecision::reject(
                ErrorKind::DailyVolumeExceeded,
                format!(
                    "daily volume limit exceeded: {:.2} + {:.2} > {:.2} USD",
                    current, priced.value_usd, limit
                ),
                json!({
                    "currentVolume": current,
                    "tradeValueUsd": priced.value_usd,
                    "newTotal": new_total,
                    "limit": limit,
                    "priceUsd": priced.price_usd,
                    "priceSource": priced.price_source,
                }),
            ),
            Err(e) => PolicyDecision::reject(
                ErrorKind::DailyVolumeExceeded,
                "volume ledger unavailable",
                json!({
                    "error": e.to_string(),
                    "tradeValueUsd": priced.value_usd,
                    "limit": limit,
                }),
            ),
        }
    }

    async fn price_trade(&self, intent: &TradeIntent) -> PricedTrade {
        let (price_usd, price_source) = match self.prices.price_usd(intent.token_in).await {
            Ok(price) if price.is_finite() && price > 0.0 => (price, "oracle"),
            Ok(price) => {
                tracing::warn!(
                    token = %intent.token_in,
                    price,
                    fallback = FALLBACK_PRICE_USD,
                    "Oracle returned unusable price, using fallback"
                );
                (FALLBACK_PRICE_USD, "fallback")
            }
            Err(e) => {
                tracing::warn!(
                    token = %intent.token_in,
                    error = %e,
                    fallback = FALLBACK_PRICE_USD,
                    "Price lookup failed, using fallback"
                );
                (FALLBACK_PRICE_USD, "fallback")
            }
        };

        let units = to_token_units(intent.amount_in, intent.token_in_decimals);
        PricedTrade {
            price_usd,
            price_source,
            value_usd: units * price_usd,
        }
    }
}

fn whitelist_rejection(intent: &TradeIntent, outcome: &WhitelistOutcome) -> Option<PolicyDecision> {
    match outcome {
        WhitelistOutcome::Skipped | WhitelistOutcome::Approved => None,
        WhitelistOutcome::Rejected {
            token_in,
            token_out,
        } => Some(PolicyDecision::reject(
            ErrorKind::TokenNotWhitelisted,
            "token not whitelisted",
            json!({
                "tokenIn": intent.token_in.to_string(),
                "tokenOut": intent.token_out.to_string(),
                "tokenInWhitelisted": token_in,
                "tokenOutWhitelisted": token_out,
            }),
        )),
        WhitelistOutcome::QueryFailed(error) => Some(PolicyDecision::reject(
            ErrorKind::TokenNotWhitelisted,
            "whitelist query failed",
            json!({
                "tokenIn": intent.token_in.to_string(),
                "tokenOut": intent.token_out.to_string(),
                "error": error,
            }),
        )),
    }
}
