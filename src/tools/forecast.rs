//! Forecast model endpoint
//!
//! POSTs recent prices and reads back a BUY/SELL/HOLD signal. The endpoint may
//! answer with `{"signal": "BUY"}` or a bare string; anything unrecognized
//! is treated as HOLD.

use super::market_data::PricePoint;
use crate::trade::Signal;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct ForecastRequest<'a> {
    prices: &'a [f64],
}

pub struct ForecastClient {
    client: reqwest::Client,
    url: String,
}

impl ForecastClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn signal(&self, history: &[PricePoint]) -> Result<Signal> {
        let prices: Vec<f64> = history.iter().map(|point| point.price).collect();

        let response = self
            .client
            .post(&self.url)
            .json(&ForecastRequest { prices: &prices })
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Rpc(format!("Forecast endpoint returned {}: {}", status, body)));
        }

        let body = response.text().await?;
        let signal = parse_signal(&body);
        tracing::info!(%signal, points = prices.len(), "Forecast signal received");
        Ok(signal)
    }
}

pub fn parse_signal(body: &str) -> Signal {
    let raw = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map
            .get("signal")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default(),
        Ok(Value::String(s)) => s,
        _ => body.to_string(),
    };

    raw.parse().unwrap_or_else(|_| {
        tracing::warn!(response = %body.chars().take(120).collect::<String>(), "Unrecognized forecast signal, holding");
        Signal::Hold
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_signal_field() {
        assert_eq!(parse_signal(r#"{"signal": "BUY", "confidence": 0.7}"#), Signal::Buy);
        assert_eq!(parse_signal(r#"{"signal": "sell"}"#), Signal::Sell);
    }

    #[test]
    fn reads_bare_strings() {
        assert_eq!(parse_signal("SELL"), Signal::Sell);
        assert_eq!(parse_signal("\"BUY\""), Signal::Buy);
        assert_eq!(parse_signal(" hold\n"), Signal::Hold);
    }

    #[test]
    fn unknown_responses_hold() {
        assert_eq!(parse_signal(r#"{"prediction": 1}"#), Signal::Hold);
        assert_eq!(parse_signal("STRONG BUY"), Signal::Hold);
        assert_eq!(parse_signal(""), Signal::Hold);
    }
}
