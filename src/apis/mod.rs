/// External HTTP APIs
pub mod client;
pub mod market_api;

pub use market_api::{MarketApiClient, MarketInfoResponse};
