/// Where order-book snapshots come from
///
/// - `OnChainSource` reads the bids/asks slabs through the chain client
/// - `ApiSource` asks the REST market data service, which also returns
///   reference token prices
use super::details::MarketDetails;
use super::orderbook::OrderBookSnapshot;
use super::slab::{decode_slab, to_levels};
use crate::apis::MarketApiClient;
use crate::errors::SwapError;
use crate::logger::{self, LogTag};
use crate::rpc::ChainClient;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

/// One fetched snapshot plus whatever prices came along with it
#[derive(Debug, Clone)]
pub struct MarketData {
    pub snapshot: OrderBookSnapshot,
    pub token_prices: HashMap<String, f64>,
    pub on_chain: bool,
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, details: &MarketDetails) -> Result<MarketData, SwapError>;
}

pub struct OnChainSource {
    client: Arc<dyn ChainClient>,
}

impl OnChainSource {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MarketDataSource for OnChainSource {
    fn name(&self) -> &'static str {
        "on-chain"
    }

    async fn fetch(&self, details: &MarketDetails) -> Result<MarketData, SwapError> {
        let (bids, asks) = futures::try_join!(
            self.client.get_account_data(&details.layout.bids),
            self.client.get_account_data(&details.layout.asks)
        )?;

        let bids = bids.ok_or_else(|| SwapError::unavailable("market-info", "bids account missing"))?;
        let asks = asks.ok_or_else(|| SwapError::unavailable("market-info", "asks account missing"))?;

        let bid_levels = to_levels(&decode_slab(&bids)?, true, details);
        let ask_levels = to_levels(&decode_slab(&asks)?, false, details);

        logger::debug(
            LogTag::Market,
            &format!(
                "On-chain book for {}: {} bid levels, {} ask levels",
                details.name,
                bid_levels.len(),
                ask_levels.len()
            ),
        );

        Ok(MarketData {
            snapshot: OrderBookSnapshot::new(bid_levels, ask_levels, Utc::now()),
            token_prices: HashMap::new(),
            on_chain: true,
        })
    }
}

pub struct ApiSource {
    api: MarketApiClient,
}

impl ApiSource {
    pub fn new(api: MarketApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl MarketDataSource for ApiSource {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn fetch(&self, details: &MarketDetails) -> Result<MarketData, SwapError> {
        let response = self.api.get_market_info(&details.address.to_string()).await?;
        let market = response
            .market
            .ok_or_else(|| SwapError::unavailable("market-info", "API returned no market"))?;

        let mut token_prices = response.token_prices;
        let missing: Vec<String> = [&details.base.name, &details.quote.name]
            .into_iter()
            .filter(|name| !token_prices.contains_key(*name))
            .cloned()
            .collect();

        if !missing.is_empty() {
            match self.api.get_token_prices(&missing).await {
                Ok(prices) => token_prices.extend(prices),
                Err(e) => logger::debug(
                    LogTag::Api,
                    &format!("Token prices unavailable for {}: {}", missing.join(", "), e),
                ),
            }
        }

        Ok(MarketData {
            snapshot: market.to_snapshot(Utc::now()),
            token_prices,
            on_chain: false,
        })
    }
}
