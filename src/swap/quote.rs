//! Expected-output estimation
//!
//! The executor derives its minimum-output bound from whatever estimate the
//! configured [`QuoteEstimator`] returns.

use super::router::BPS_DENOMINATOR;
use crate::trade::TradeIntent;
use crate::Result;
use alloy::primitives::U256;
use async_trait::async_trait;

#[async_trait]
pub trait QuoteEstimator: Send + Sync {
    /// Expected `token_out` amount, in its smallest unit
    async fn expected_out(&self, intent: &TradeIntent) -> Result<U256>;

    fn name(&self) -> &'static str;
}

/// Expected output as a fixed fraction of the input amount.
///
/// Ignores prices entirely; only meaningful for pairs with matching units.
#[derive(Debug, Clone, Copy)]
pub struct FixedHaircutEstimator {
    keep_bps: u32,
}

impl FixedHaircutEstimator {
    /// 2% haircut
    pub const DEFAULT_KEEP_BPS: u32 = 9_800;

    pub fn new(keep_bps: u32) -> Self {
        Self {
            keep_bps: keep_bps.min(BPS_DENOMINATOR),
        }
    }

    pub fn estimate(&self, amount_in: U256) -> U256 {
        amount_in * U256::from(self.keep_bps) / U256::from(BPS_DENOMINATOR)
    }
}

impl Default for FixedHaircutEstimator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_KEEP_BPS)
    }
}

#[async_trait]
impl QuoteEstimator for FixedHaircutEstimator {
    async fn expected_out(&self, intent: &TradeIntent) -> Result<U256> {
        Ok(self.estimate(intent.amount_in))
    }

    fn name(&self) -> &'static str {
        "fixed_haircut"
    }
}
