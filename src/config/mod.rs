//! Configuration for the guardrail trading agent
//!
//! Values come from (lowest to highest priority) built-in defaults, an optional
//! JSON config file, and environment variables (a `.env` file is loaded by the
//! binary). Unparseable environment values are configuration errors.

pub mod rpc;

use crate::tokens::{addresses, MAX_DECIMALS};
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

pub use rpc::RpcConfig;

/// Environment variable names recognized by [`Config::apply_env`]
pub mod env_keys {
    pub const MAX_SLIPPAGE_BPS: &str = "MAX_SLIPPAGE_BPS";
    pub const MIN_SLIPPAGE_BPS: &str = "MIN_SLIPPAGE_BPS";
    pub const MAX_DAILY_VOLUME_USD: &str = "MAX_DAILY_VOLUME_USD";
    pub const VOLUME_RETENTION_DAYS: &str = "VOLUME_RETENTION_DAYS";
    pub const WHITELIST_CONTRACT_ADDRESS: &str = "WHITELIST_CONTRACT_ADDRESS";

    pub const SWAP_ROUTER_ADDRESS: &str = "SWAP_ROUTER_ADDRESS";
    pub const SWAP_FEE_TIER: &str = "SWAP_FEE_TIER";
    pub const SWAP_DEADLINE_SECS: &str = "SWAP_DEADLINE_SECS";
    pub const CONFIRMATION_TIMEOUT_SECS: &str = "CONFIRMATION_TIMEOUT_SECS";
    pub const CHAIN_ID: &str = "CHAIN_ID";
    pub const PRICE_SOURCE: &str = "PRICE_SOURCE";
    pub const QUOTE_SOURCE: &str = "QUOTE_SOURCE";

    pub const TRADE_BASE_TOKEN: &str = "TRADE_BASE_TOKEN";
    pub const TRADE_QUOTE_TOKEN: &str = "TRADE_QUOTE_TOKEN";
    pub const TRADE_BASE_DECIMALS: &str = "TRADE_BASE_DECIMALS";
    pub const TRADE_QUOTE_DECIMALS: &str = "TRADE_QUOTE_DECIMALS";
    pub const TRADE_BUY_AMOUNT: &str = "TRADE_BUY_AMOUNT";
    pub const TRADE_SELL_AMOUNT: &str = "TRADE_SELL_AMOUNT";
    pub const TRADE_SLIPPAGE_BPS: &str = "TRADE_SLIPPAGE_BPS";
    pub const CHECK_INTERVAL_SECS: &str = "CHECK_INTERVAL_SECS";

    pub const MARKET_DATA_URL: &str = "MARKET_DATA_URL";
    pub const MARKET_COIN_ID: &str = "MARKET_COIN_ID";
    pub const FORECAST_URL: &str = "FORECAST_URL";
    pub const LEADERBOARD_URL: &str = "LEADERBOARD_URL";
    pub const AGENT_ID: &str = "AGENT_ID";

    pub const WALLET_ADDRESS: &str = "WALLET_ADDRESS";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const AUDIT_LOG_PATH: &str = "AUDIT_LOG_PATH";
}

/// Uniswap V3 fee tiers accepted for the swap router
pub const FEE_TIERS: [u32; 4] = [100, 500, 3000, 10000];

/// Where the policy engine gets USD prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Odos quote of one token unit into USDC
    #[default]
    Odos,
    /// Static registry prices (stablecoins at $1, approximate prices otherwise)
    Registry,
}

impl FromStr for PriceSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "odos" => Ok(PriceSource::Odos),
            "registry" => Ok(PriceSource::Registry),
            other => Err(format!("unknown price source '{}'", other)),
        }
    }
}

/// Where the executor gets its expected output amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    /// Fixed 2% haircut of the input amount
    #[default]
    FixedHaircut,
    /// Live Odos quote
    Odos,
}

impl FromStr for QuoteSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed_haircut" | "haircut" => Ok(QuoteSource::FixedHaircut),
            "odos" => Ok(QuoteSource::Odos),
            other => Err(format!("unknown quote source '{}'", other)),
        }
    }
}

/// Guardrail policy limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Maximum slippage tolerance in basis points (300 = 3%)
    pub max_slippage_bps: u32,
    /// Minimum slippage tolerance in basis points
    pub min_slippage_bps: u32,
    /// Maximum traded USD value per wallet per UTC day
    pub max_daily_volume_usd: f64,
    /// Days of volume history kept before eviction
    pub volume_retention_days: u32,
    /// Allow-list contract; `None` disables the whitelist check
    pub whitelist_contract: Option<Address>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_slippage_bps: 300,
            min_slippage_bps: 1,
            max_daily_volume_usd: 10_000.0,
            volume_retention_days: 7,
            whitelist_contract: None,
        }
    }
}

/// Swap execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Chain the agent trades on
    pub chain_id: u64,
    /// Uniswap V3 SwapRouter address; required to execute swaps
    pub router_address: Option<Address>,
    /// Pool fee tier in hundredths of a bip (3000 = 0.3%)
    pub fee_tier: u32,
    /// Seconds from submission until the swap deadline
    pub deadline_secs: u64,
    /// Seconds to wait for each transaction to confirm
    pub confirmation_timeout_secs: u64,
    #[serde(default)]
    pub price_source: PriceSource,
    #[serde(default)]
    pub quote_source: QuoteSource,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            chain_id: rpc::chains::ETHEREUM,
            router_address: None,
            fee_tier: 3000,
            deadline_secs: 600,
            confirmation_timeout_secs: 180,
            price_source: PriceSource::default(),
            quote_source: QuoteSource::default(),
        }
    }
}

/// The traded pair and per-cycle sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Token bought on a BUY signal
    pub base_token: Address,
    /// Token spent on a BUY signal
    pub quote_token: Address,
    /// Overrides the registry's decimals for the base token
    pub base_decimals: Option<u8>,
    /// Overrides the registry's decimals for the quote token
    pub quote_decimals: Option<u8>,
    /// Quote-token amount spent per BUY, in smallest units
    pub buy_amount: String,
    /// Base-token amount spent per SELL, in smallest units
    pub sell_amount: String,
    /// Slippage tolerance requested for each trade
    pub slippage_bps: u32,
    /// Seconds between cycles
    pub check_interval_secs: u64,
}

impl TradingConfig {
    pub fn buy_amount(&self) -> Result<U256> {
        parse_amount("buy_amount", &self.buy_amount)
    }

    pub fn sell_amount(&self) -> Result<U256> {
        parse_amount("sell_amount", &self.sell_amount)
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            base_token: addresses::WETH_ETH,
            quote_token: addresses::USDC_ETH,
            base_decimals: None,
            quote_decimals: None,
            buy_amount: "100000000".to_string(),          // 100 USDC
            sell_amount: "30000000000000000".to_string(), // 0.03 WETH
            slippage_bps: 50,
            check_interval_secs: 3600,
        }
    }
}

/// External HTTP collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Market data API base (CoinGecko-compatible)
    pub market_data_url: String,
    /// Coin id used for the price history lookup
    pub market_coin_id: String,
    /// Days of hourly history sent to the forecaster
    pub market_history_days: u32,
    /// Model-serving endpoint returning BUY / SELL / HOLD
    pub forecast_url: Option<String>,
    /// Leaderboard endpoint receiving cycle reports
    pub leaderboard_url: Option<String>,
    /// Identifier reported to the leaderboard
    pub agent_id: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            market_data_url: "https://api.coingecko.com/api/v3".to_string(),
            market_coin_id: "ethereum".to_string(),
            market_history_days: 5,
            forecast_url: None,
            leaderboard_url: None,
            agent_id: "guardrail-agent".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub guardrails: GuardrailConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    /// Public address of the trading wallet (derived from the key when unset)
    #[serde(default)]
    pub wallet_address: Option<Address>,
    /// Path to the JSONL audit log
    #[serde(default)]
    pub audit_log_path: Option<String>,
}

impl Config {
    /// Load from an optional JSON file, then apply environment overrides.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&content)
                    .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?
            }
            None => Config::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        use env_keys::*;

        let g = &mut self.guardrails;
        set(&mut g.max_slippage_bps, parse_var(&lookup, MAX_SLIPPAGE_BPS)?);
        set(&mut g.min_slippage_bps, parse_var(&lookup, MIN_SLIPPAGE_BPS)?);
        set(&mut g.max_daily_volume_usd, parse_var(&lookup, MAX_DAILY_VOLUME_USD)?);
        set(&mut g.volume_retention_days, parse_var(&lookup, VOLUME_RETENTION_DAYS)?);
        if let Some(addr) = parse_var(&lookup, WHITELIST_CONTRACT_ADDRESS)? {
            g.whitelist_contract = Some(addr);
        }

        let e = &mut self.execution;
        set(&mut e.chain_id, parse_var(&lookup, CHAIN_ID)?);
        if let Some(addr) = parse_var(&lookup, SWAP_ROUTER_ADDRESS)? {
            e.router_address = Some(addr);
        }
        set(&mut e.fee_tier, parse_var(&lookup, SWAP_FEE_TIER)?);
        set(&mut e.deadline_secs, parse_var(&lookup, SWAP_DEADLINE_SECS)?);
        set(&mut e.confirmation_timeout_secs, parse_var(&lookup, CONFIRMATION_TIMEOUT_SECS)?);
        set(&mut e.price_source, parse_var(&lookup, PRICE_SOURCE)?);
        set(&mut e.quote_source, parse_var(&lookup, QUOTE_SOURCE)?);

        let t = &mut self.trading;
        set(&mut t.base_token, parse_var(&lookup, TRADE_BASE_TOKEN)?);
        set(&mut t.quote_token, parse_var(&lookup, TRADE_QUOTE_TOKEN)?);
        if let Some(decimals) = parse_var(&lookup, TRADE_BASE_DECIMALS)? {
            t.base_decimals = Some(decimals);
        }
        if let Some(decimals) = parse_var(&lookup, TRADE_QUOTE_DECIMALS)? {
            t.quote_decimals = Some(decimals);
        }
        set(&mut t.buy_amount, parse_var(&lookup, TRADE_BUY_AMOUNT)?);
        set(&mut t.sell_amount, parse_var(&lookup, TRADE_SELL_AMOUNT)?);
        set(&mut t.slippage_bps, parse_var(&lookup, TRADE_SLIPPAGE_BPS)?);
        set(&mut t.check_interval_secs, parse_var(&lookup, CHECK_INTERVAL_SECS)?);

        let p = &mut self.endpoints;
        set(&mut p.market_data_url, parse_var(&lookup, MARKET_DATA_URL)?);
        set(&mut p.market_coin_id, parse_var(&lookup, MARKET_COIN_ID)?);
        if let Some(url) = parse_var(&lookup, FORECAST_URL)? {
            p.forecast_url = Some(url);
        }
        if let Some(url) = parse_var(&lookup, LEADERBOARD_URL)? {
            p.leaderboard_url = Some(url);
        }
        set(&mut p.agent_id, parse_var(&lookup, AGENT_ID)?);

        if let Some(addr) = parse_var(&lookup, WALLET_ADDRESS)? {
            self.wallet_address = Some(addr);
        }
        if let Some(path) = parse_var(&lookup, AUDIT_LOG_PATH)? {
            self.audit_log_path = Some(path);
        }

        Ok(())
    }

    /// Reject internally inconsistent settings.
    ///
    /// A missing router address is not checked here: it only matters once a
    /// swap executor is built.
    pub fn validate(&self) -> Result<()> {
        let g = &self.guardrails;
        if g.min_slippage_bps == 0 {
            return Err(Error::Config("min_slippage_bps must be at least 1".to_string()));
        }
        if g.min_slippage_bps > g.max_slippage_bps {
            return Err(Error::Config(format!(
                "min_slippage_bps ({}) exceeds max_slippage_bps ({})",
                g.min_slippage_bps, g.max_slippage_bps
            )));
        }
        if g.max_slippage_bps >= 10_000 {
            return Err(Error::Config(format!(
                "max_slippage_bps must be below 10000, got {}",
                g.max_slippage_bps
            )));
        }
        if !(g.max_daily_volume_usd.is_finite() && g.max_daily_volume_usd > 0.0) {
            return Err(Error::Config(format!(
                "max_daily_volume_usd must be a positive number, got {}",
                g.max_daily_volume_usd
            )));
        }

        let e = &self.execution;
        if !FEE_TIERS.contains(&e.fee_tier) {
            return Err(Error::Config(format!(
                "Unsupported fee tier {} (expected one of {:?})",
                e.fee_tier, FEE_TIERS
            )));
        }
        if e.deadline_secs == 0 || e.confirmation_timeout_secs == 0 {
            return Err(Error::Config(
                "deadline_secs and confirmation_timeout_secs must be positive".to_string(),
            ));
        }

        let t = &self.trading;
        if t.base_token == t.quote_token {
            return Err(Error::Config(
                "base_token and quote_token must differ".to_string(),
            ));
        }
        t.buy_amount()?;
        t.sell_amount()?;
        for decimals in [t.base_decimals, t.quote_decimals].into_iter().flatten() {
            if decimals > MAX_DECIMALS {
                return Err(Error::Config(format!(
                    "Token decimals must be at most {}, got {}",
                    MAX_DECIMALS, decimals
                )));
            }
        }
        if t.check_interval_secs == 0 {
            return Err(Error::Config("check_interval_secs must be positive".to_string()));
        }

        Ok(())
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", key, e))),
    }
}

fn parse_amount(field: &str, raw: &str) -> Result<U256> {
    U256::from_str(raw.trim())
        .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", field, raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_limits() {
        let config = Config::default();
        assert_eq!(config.guardrails.max_slippage_bps, 300);
        assert_eq!(config.guardrails.min_slippage_bps, 1);
        assert_eq!(config.guardrails.max_daily_volume_usd, 10_000.0);
        assert!(config.guardrails.whitelist_contract.is_none());
        assert!(config.execution.router_address.is_none());
        assert_eq!(config.execution.fee_tier, 3000);
        assert_eq!(config.execution.deadline_secs, 600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_are_applied() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[
                ("MAX_SLIPPAGE_BPS", "150"),
                ("MAX_DAILY_VOLUME_USD", "2500.5"),
                (
                    "SWAP_ROUTER_ADDRESS",
                    "0xE592427A0AEce92De3Edee1F18E0157C05861564",
                ),
                (
                    "WHITELIST_CONTRACT_ADDRESS",
                    "0x1234567890123456789012345678901234567890",
                ),
                ("QUOTE_SOURCE", "odos"),
                ("TRADE_BASE_DECIMALS", "8"),
            ]))
            .unwrap();

        assert_eq!(config.guardrails.max_slippage_bps, 150);
        assert_eq!(config.guardrails.max_daily_volume_usd, 2500.5);
        assert!(config.execution.router_address.is_some());
        assert!(config.guardrails.whitelist_contract.is_some());
        assert_eq!(config.execution.quote_source, QuoteSource::Odos);
        assert_eq!(config.trading.base_decimals, Some(8));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[("WHITELIST_CONTRACT_ADDRESS", "  ")]))
            .unwrap();
        assert!(config.guardrails.whitelist_contract.is_none());
    }

    #[test]
    fn unparseable_env_value_is_config_error() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup_from(&[("MAX_SLIPPAGE_BPS", "three percent")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("MAX_SLIPPAGE_BPS")));
    }

    #[test]
    fn validate_rejects_inverted_slippage_bounds() {
        let mut config = Config::default();
        config.guardrails.min_slippage_bps = 500;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn validate_rejects_oversized_decimals() {
        let mut config = Config::default();
        config.trading.quote_decimals = Some(80);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.trading.quote_decimals = Some(6);
        config.trading.base_decimals = Some(18);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unknown_fee_tier() {
        let mut config = Config::default();
        config.execution.fee_tier = 2500;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn config_file_sections_default_when_missing() {
        let value = serde_json::json!({
            "guardrails": {
                "max_slippage_bps": 200,
                "min_slippage_bps": 5,
                "max_daily_volume_usd": 1000.0,
                "volume_retention_days": 3,
                "whitelist_contract": null
            }
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.guardrails.max_slippage_bps, 200);
        assert_eq!(parsed.execution.fee_tier, 3000);
        assert_eq!(parsed.trading.slippage_bps, 50);
    }
}
