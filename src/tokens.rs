//! Token registry and unit conversion
//!
//! Known token metadata (symbol, decimals, stablecoin flag, approximate price)
//! used to resolve decimals for trade intents and as an offline price source.

use alloy::primitives::{address, Address, U256};
use std::collections::HashMap;

/// Token metadata
#[derive(Debug, Clone, Copy)]
pub struct TokenInfo {
    pub symbol: &'static str,
    pub decimals: u8,
    /// Pegged to $1
    pub is_stablecoin: bool,
    /// Approximate USD price, only used when no live oracle is configured
    pub approx_price_usd: Option<f64>,
}

impl TokenInfo {
    pub const fn stablecoin(symbol: &'static str, decimals: u8) -> Self {
        Self {
            symbol,
            decimals,
            is_stablecoin: true,
            approx_price_usd: Some(1.0),
        }
    }

    pub const fn token(symbol: &'static str, decimals: u8, approx_price: Option<f64>) -> Self {
        Self {
            symbol,
            decimals,
            is_stablecoin: false,
            approx_price_usd: approx_price,
        }
    }
}

/// Well-known token addresses per chain
pub mod addresses {
    use super::*;

    // === Ethereum Mainnet ===
    pub const USDC_ETH: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    pub const USDT_ETH: Address = address!("dac17f958d2ee523a2206206994597c13d831ec7");
    pub const DAI_ETH: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
    pub const WETH_ETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
    pub const WBTC_ETH: Address = address!("2260fac5e5542a773aa44fbcfedf7c193bc2c599");

    // === Arbitrum ===
    pub const USDC_ARB: Address = address!("af88d065e77c8cc2239327c5edb3a432268e5831");
    pub const USDT_ARB: Address = address!("fd086bc7cd5c481dcc9c85ebe478a1c0b69fcbb9");
    pub const WETH_ARB: Address = address!("82af49447d8a07e3bd95bd0d56f35241523fbab1");

    // === Optimism ===
    pub const USDC_OPT: Address = address!("0b2c639c533813f4aa9d7837caf62653d097ff85");
    pub const WETH_OPT: Address = address!("4200000000000000000000000000000000000006");

    // === Base ===
    pub const USDC_BASE: Address = address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913");
    pub const WETH_BASE: Address = address!("4200000000000000000000000000000000000006");
}

/// Token registry providing token info lookups
pub struct TokenRegistry {
    tokens: HashMap<Address, TokenInfo>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        use addresses::*;

        let mut tokens = HashMap::new();

        tokens.insert(USDC_ETH, TokenInfo::stablecoin("USDC", 6));
        tokens.insert(USDC_ARB, TokenInfo::stablecoin("USDC", 6));
        tokens.insert(USDC_OPT, TokenInfo::stablecoin("USDC", 6));
        tokens.insert(USDC_BASE, TokenInfo::stablecoin("USDC", 6));
        tokens.insert(USDT_ETH, TokenInfo::stablecoin("USDT", 6));
        tokens.insert(USDT_ARB, TokenInfo::stablecoin("USDT", 6));
        tokens.insert(DAI_ETH, TokenInfo::stablecoin("DAI", 18));

        tokens.insert(WETH_ETH, TokenInfo::token("WETH", 18, Some(3500.0)));
        tokens.insert(WETH_ARB, TokenInfo::token("WETH", 18, Some(3500.0)));
        // Optimism and Base share the predeploy address
        tokens.insert(WETH_OPT, TokenInfo::token("WETH", 18, Some(3500.0)));
        tokens.insert(WBTC_ETH, TokenInfo::token("WBTC", 8, Some(95000.0)));

        Self { tokens }
    }

    pub fn get(&self, address: &Address) -> Option<&TokenInfo> {
        self.tokens.get(address)
    }

    pub fn decimals(&self, address: &Address) -> Option<u8> {
        self.tokens.get(address).map(|info| info.decimals)
    }

    pub fn symbol(&self, address: &Address) -> &'static str {
        self.tokens
            .get(address)
            .map(|info| info.symbol)
            .unwrap_or("UNKNOWN")
    }

    pub fn is_stablecoin(&self, address: &Address) -> bool {
        self.tokens
            .get(address)
            .map(|t| t.is_stablecoin)
            .unwrap_or(false)
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: std::sync::OnceLock<TokenRegistry> = std::sync::OnceLock::new();

/// Get the global token registry
pub fn registry() -> &'static TokenRegistry {
    REGISTRY.get_or_init(TokenRegistry::new)
}

/// Largest decimals whose unit scale (10^decimals) fits in a U256
pub const MAX_DECIMALS: u8 = 77;

/// Format a raw amount as a decimal string with `decimals` fractional digits
pub fn format_units(value: U256, decimals: u8) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    // Past MAX_DECIMALS the scale exceeds any U256, so everything is fractional
    let (whole, remainder) = match U256::from(10).checked_pow(U256::from(decimals)) {
        Some(divisor) => (value / divisor, value % divisor),
        None => (U256::ZERO, value),
    };

    if remainder.is_zero() {
        return whole.to_string();
    }

    let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
    let trimmed = remainder_str.trim_end_matches('0');
    format!("{}.{}", whole, trimmed)
}

/// Convert a raw amount into whole-token units as a float.
///
/// Lossy above 2^53 whole units, which is far beyond any USD sizing concern.
pub fn to_token_units(value: U256, decimals: u8) -> f64 {
    format_units(value, decimals).parse().unwrap_or(f64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_info() {
        let registry = TokenRegistry::new();

        let usdc = registry.get(&addresses::USDC_ETH).unwrap();
        assert_eq!(usdc.symbol, "USDC");
        assert_eq!(usdc.decimals, 6);
        assert!(usdc.is_stablecoin);

        assert_eq!(registry.decimals(&addresses::WBTC_ETH), Some(8));
        assert!(!registry.is_stablecoin(&addresses::WETH_ETH));
    }

    #[test]
    fn scale_beyond_u256_stays_fractional() {
        assert_eq!(
            format_units(U256::from(15u64), MAX_DECIMALS),
            format!("0.{}15", "0".repeat(75))
        );

        let amount = U256::from(10u64).pow(U256::from(20u64));
        assert_eq!(format_units(amount, 80), format!("0.{}1", "0".repeat(59)));
        assert!(to_token_units(amount, 80) < 1e-50);
    }

    #[test]
    fn unknown_token_has_no_decimals() {
        let unknown = address!("1234567890123456789012345678901234567890");
        assert_eq!(registry().decimals(&unknown), None);
        assert_eq!(registry().symbol(&unknown), "UNKNOWN");
    }

    #[test]
    fn test_format_units() {
        let one_eth = U256::from(1_000_000_000_000_000_000u128);
        assert_eq!(format_units(one_eth, 18), "1");

        let one_point_five = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(format_units(one_point_five, 18), "1.5");

        let thousand_usdc = U256::from(1_000_000_000u64);
        assert_eq!(format_units(thousand_usdc, 6), "1000");

        assert_eq!(format_units(U256::from(5u64), 6), "0.000005");
        assert_eq!(format_units(U256::ZERO, 18), "0");
    }

    #[test]
    fn to_token_units_respects_decimals() {
        // 250 USDC
        assert_eq!(to_token_units(U256::from(250_000_000u64), 6), 250.0);
        // 0.5 WETH
        assert_eq!(to_token_units(U256::from(500_000_000_000_000_000u128), 18), 0.5);
        assert_eq!(to_token_units(U256::from(42u64), 0), 42.0);
    }
}
