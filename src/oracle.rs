//! USD price lookups used to size trades for the daily volume limit

use crate::tokens::TokenRegistry;
use crate::{Error, Result};
use alloy::primitives::Address;
use async_trait::async_trait;

/// Read-only price source
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Current USD price of one whole token
    async fn price_usd(&self, token: Address) -> Result<f64>;
}

/// Offline oracle backed by the token registry.
///
/// Stablecoins price at $1; other known tokens use their approximate price.
pub struct RegistryPriceOracle {
    registry: &'static TokenRegistry,
}

impl RegistryPriceOracle {
    pub fn new(registry: &'static TokenRegistry) -> Self {
        Self { registry }
    }
}

impl Default for RegistryPriceOracle {
    fn default() -> Self {
        Self::new(crate::tokens::registry())
    }
}

#[async_trait]
impl PriceOracle for RegistryPriceOracle {
    async fn price_usd(&self, token: Address) -> Result<f64> {
        let info = self
            .registry
            .get(&token)
            .ok_or_else(|| Error::Oracle(format!("No registry price for {}", token)))?;
        info.approx_price_usd
            .ok_or_else(|| Error::Oracle(format!("{} has no approximate price", info.symbol)))
    }
}
