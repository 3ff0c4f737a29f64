/// Market data: layout decoding, order book snapshots and the refresh feed
pub mod details;
pub mod feed;
pub mod orderbook;
pub mod reconciler;
pub mod scheduler;
pub mod slab;
pub mod source;

pub use details::{load_market_details, MarketDetails, MarketLayout, TokenDescriptor};
pub use feed::{FeedSettings, MarketFeed, RefreshLocks};
pub use orderbook::{Level, OrderBookSnapshot};
pub use reconciler::{Adoption, Reconciled, SnapshotReconciler, STALE_PRICE_ALERT};
pub use scheduler::ScheduledTask;
pub use source::{ApiSource, MarketData, MarketDataSource, OnChainSource};
