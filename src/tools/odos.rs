//! Odos DEX aggregator client
//!
//! Serves two read-only roles: USD pricing for volume sizing (quote one token
//! unit into USDC) and expected-output estimates for the swap executor.
//!
//! SECURITY NOTE:
//! - Quotes only; nothing here builds, signs or submits transactions

use crate::oracle::PriceOracle;
use crate::swap::QuoteEstimator;
use crate::tokens::{addresses, registry, TokenRegistry};
use crate::trade::TradeIntent;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use odos_sdk::{Chain, Slippage};
use std::str::FromStr;

/// Slippage passed to Odos for quote-only requests
const QUOTE_SLIPPAGE_PERCENT: f64 = 1.0;

pub struct OdosTool {
    client: odos_sdk::OdosClient,
    chain: Chain,
    usdc: Address,
    /// Address quotes are requested for (public, safe to share)
    wallet_address: Address,
    registry: &'static TokenRegistry,
}

impl OdosTool {
    pub fn try_new(chain_id: u64, wallet_address: Address) -> Result<Self> {
        let chain = chain_from_id(chain_id)
            .ok_or_else(|| Error::Config(format!("Unsupported chain ID for Odos: {}", chain_id)))?;
        let usdc = usdc_for_chain(chain_id)
            .ok_or_else(|| Error::Config(format!("No USDC address for chain {}", chain_id)))?;
        let client = odos_sdk::OdosClient::new()
            .map_err(|e| Error::Quote(format!("Failed to create Odos client: {}", e)))?;

        Ok(Self {
            client,
            chain,
            usdc,
            wallet_address,
            registry: registry(),
        })
    }

    /// Raw output amount for swapping `amount` of `from` into `to`
    pub async fn quote_out(&self, from: Address, amount: U256, to: Address) -> Result<U256> {
        let slippage = Slippage::percent(QUOTE_SLIPPAGE_PERCENT)
            .map_err(|e| Error::Quote(format!("Invalid slippage: {}", e)))?;

        let quote = self
            .client
            .swap()
            .chain(self.chain.clone())
            .from_token(from, amount)
            .to_token(to)
            .slippage(slippage)
            .signer(self.wallet_address)
            .quote()
            .await
            .map_err(|e| Error::Quote(format!("Odos quote failed: {}", e)))?;

        let out = quote
            .out_amount()
            .ok_or_else(|| Error::Quote("Odos quote has no output amount".to_string()))?;
        U256::from_str(out).map_err(|e| Error::Quote(format!("Invalid output amount '{}': {}", out, e)))
    }
}

#[async_trait]
impl PriceOracle for OdosTool {
    /// Stablecoins are $1 without an API call; anything else quotes one unit into USDC.
    async fn price_usd(&self, token: Address) -> Result<f64> {
        if self.registry.is_stablecoin(&token) {
            return Ok(1.0);
        }

        let decimals = self
            .registry
            .decimals(&token)
            .ok_or_else(|| Error::Oracle(format!("Unknown decimals for {}", token)))?;
        let one_unit = U256::from(10).pow(U256::from(decimals));

        let usdc_out = self
            .quote_out(token, one_unit, self.usdc)
            .await
            .map_err(|e| Error::Oracle(e.to_string()))?;
        let price = crate::tokens::to_token_units(usdc_out, 6);

        tracing::debug!(
            token = %token,
            symbol = self.registry.symbol(&token),
            price_usd = price,
            "Odos price quote"
        );
        Ok(price)
    }
}

#[async_trait]
impl QuoteEstimator for OdosTool {
    async fn expected_out(&self, intent: &TradeIntent) -> Result<U256> {
        self.quote_out(intent.token_in, intent.amount_in, intent.token_out)
            .await
    }

    fn name(&self) -> &'static str {
        "odos"
    }
}

/// USDC address for a chain
fn usdc_for_chain(chain_id: u64) -> Option<Address> {
    match chain_id {
        1 => Some(addresses::USDC_ETH),
        42161 => Some(addresses::USDC_ARB),
        10 => Some(addresses::USDC_OPT),
        8453 => Some(addresses::USDC_BASE),
        _ => None,
    }
}

fn chain_from_id(chain_id: u64) -> Option<Chain> {
    match chain_id {
        1 => Some(Chain::ethereum()),
        42161 => Some(Chain::arbitrum()),
        10 => Some(Chain::optimism()),
        8453 => Some(Chain::base()),
        137 => Some(Chain::polygon()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usdc_known_on_supported_chains() {
        assert_eq!(usdc_for_chain(1), Some(addresses::USDC_ETH));
        assert_eq!(usdc_for_chain(8453), Some(addresses::USDC_BASE));
        assert_eq!(usdc_for_chain(56), None);
    }

    #[test]
    fn unsupported_chain_is_config_error() {
        let result = OdosTool::try_new(56, Address::ZERO);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn stablecoins_price_without_network() {
        let tool = OdosTool::try_new(1, Address::ZERO).unwrap();
        assert_eq!(tool.price_usd(addresses::USDC_ETH).await.unwrap(), 1.0);
        assert_eq!(tool.price_usd(addresses::DAI_ETH).await.unwrap(), 1.0);
    }
}
