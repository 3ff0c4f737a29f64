/// REST client for the market data service
///
/// Endpoints:
/// 1. POST markets/get-token-prices  {tokens: [...]} -> {tokenPrices: {name: price}}
/// 2. GET  markets/info?address=...  -> {market: <snapshot>, tokenPrices}
use crate::apis::client::RateLimiter;
use crate::config::with_config;
use crate::errors::SwapError;
use crate::logger::{self, LogTag};
use crate::market::orderbook::{Level, OrderBookSnapshot};
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Requests per minute allowed against the market data service
pub const RATE_LIMIT_PER_MINUTE: usize = 120;

/// Snapshot shape returned by markets/info
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMarketOrders {
    #[serde(default)]
    pub bids: Vec<Vec<f64>>,
    #[serde(default)]
    pub asks: Vec<Vec<f64>>,
    #[serde(default)]
    pub total_base_quantity: f64,
    #[serde(default)]
    pub total_quote_quantity: f64,
    #[serde(default)]
    pub highest_bid: f64,
    #[serde(default)]
    pub lowest_ask: f64,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInfoResponse {
    pub market: Option<ApiMarketOrders>,
    #[serde(default)]
    pub token_prices: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPricesResponse {
    #[serde(default)]
    token_prices: HashMap<String, f64>,
}

impl ApiMarketOrders {
    /// Convert to a snapshot; levels are re-sorted and aggregates recomputed
    pub fn to_snapshot(&self, received_at: DateTime<Utc>) -> OrderBookSnapshot {
        OrderBookSnapshot::new(
            to_levels(&self.bids),
            to_levels(&self.asks),
            parse_updated_at(&self.updated_at).unwrap_or(received_at),
        )
    }
}

fn to_levels(raw: &[Vec<f64>]) -> Vec<Level> {
    raw.iter()
        .filter(|entry| entry.len() >= 2)
        .map(|entry| Level::new(entry[0], entry[1]))
        .collect()
}

/// Accepts RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC)
pub fn parse_updated_at(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

pub struct MarketApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    limiter: RateLimiter,
}

impl MarketApiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, SwapError> {
        if base_url.is_empty() {
            return Err(SwapError::Config("api.base_url is empty".to_string()));
        }
        if timeout_secs == 0 {
            return Err(SwapError::Config("api.timeout_secs must be greater than zero".to_string()));
        }

        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };

        Ok(Self {
            client: Client::new(),
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            limiter: RateLimiter::new(RATE_LIMIT_PER_MINUTE),
        })
    }

    /// Build from the `[api]` section, `None` when the API is disabled
    pub fn from_config() -> Result<Option<Self>, SwapError> {
        let (enabled, base_url, timeout) = with_config(|cfg| {
            (cfg.api.enabled, cfg.api.base_url.clone(), cfg.api.timeout_secs)
        });
        if !enabled {
            return Ok(None);
        }
        Self::new(&base_url, timeout).map(Some)
    }

    async fn send_json<T>(&self, endpoint: &str, builder: reqwest::RequestBuilder) -> Result<T, SwapError>
    where
        T: DeserializeOwned,
    {
        let _guard = self
            .limiter
            .acquire()
            .await
            .map_err(SwapError::Network)?;

        logger::debug(LogTag::Api, &format!("→ {}", endpoint));

        let response = builder
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SwapError::unavailable(
                endpoint,
                format!("HTTP {}: {}", status, crate::utils::safe_truncate(&body, 200)),
            ));
        }

        response.json::<T>().await.map_err(SwapError::from)
    }

    /// Reference prices keyed by token name. Missing tokens map to 0.
    pub async fn get_token_prices(&self, tokens: &[String]) -> Result<HashMap<String, f64>, SwapError> {
        let endpoint = "markets/get-token-prices";
        let url = format!("{}{}", self.base_url, endpoint);
        let builder = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "tokens": tokens }));

        let response: TokenPricesResponse = self.send_json(endpoint, builder).await?;

        Ok(tokens
            .iter()
            .map(|token| {
                let price = response.token_prices.get(token).copied().unwrap_or(0.0);
                (token.clone(), price)
            })
            .collect())
    }

    /// Market snapshot and prices for one market
    pub async fn get_market_info(&self, address: &str) -> Result<MarketInfoResponse, SwapError> {
        let endpoint = "markets/info";
        let url = format!("{}{}", self.base_url, endpoint);
        let builder = self.client.get(&url).query(&[("address", address)]);

        self.send_json(endpoint, builder).await
    }
}
