//! Market price history
//!
//! CoinGecko-style `market_chart` endpoint: `{"prices": [[ts_ms, price], ...]}`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One point of USD price history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp_ms: i64,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(f64, f64)>,
}

pub struct MarketDataClient {
    client: reqwest::Client,
    base_url: String,
    coin_id: String,
    days: u32,
}

impl MarketDataClient {
    pub fn new(base_url: impl Into<String>, coin_id: impl Into<String>, days: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            coin_id: coin_id.into(),
            days,
        })
    }

    pub fn chart_url(&self) -> String {
        format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days={}",
            self.base_url, self.coin_id, self.days
        )
    }

    /// Fetch price history, oldest first
    pub async fn fetch_prices(&self) -> Result<Vec<PricePoint>> {
        let url = self.chart_url();
        tracing::debug!(url = %url, "Fetching market history");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Rpc(format!(
                "Market data API returned {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        parse_market_chart(&body)
    }
}

pub fn parse_market_chart(body: &str) -> Result<Vec<PricePoint>> {
    let chart: MarketChartResponse = serde_json::from_str(body)?;
    let mut points: Vec<PricePoint> = chart
        .prices
        .into_iter()
        .filter(|(_, price)| price.is_finite())
        .map(|(ts, price)| PricePoint {
            timestamp_ms: ts as i64,
            price,
        })
        .collect();

    if points.is_empty() {
        return Err(Error::InvalidArgument(
            "Market data response has no prices".to_string(),
        ));
    }
    points.sort_by_key(|point| point.timestamp_ms);
    Ok(points)
}
