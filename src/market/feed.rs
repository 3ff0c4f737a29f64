/// Market feed: owns the reconciled snapshot of one market
///
/// Each refresh asks the REST API first. When the API fails the feed drops
/// into on-chain mode and reads the slabs every `onchain_every_ticks` ticks
/// until the API recovers. Without an API every tick reads from chain.
/// Refreshes of the same market are single-flight.
use super::details::MarketDetails;
use super::orderbook::OrderBookSnapshot;
use super::reconciler::SnapshotReconciler;
use super::scheduler::ScheduledTask;
use super::source::{MarketData, MarketDataSource};
use crate::config::with_config;
use crate::errors::SwapError;
use crate::logger::{self, LogTag};
use chrono::Utc;
use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub refresh_interval: Duration,
    pub onchain_every_ticks: u64,
    pub stale_alert_minutes: i64,
    pub max_spread: f64,
}

impl FeedSettings {
    pub fn from_config() -> Self {
        with_config(|cfg| Self {
            refresh_interval: Duration::from_millis(cfg.feed.refresh_interval_ms),
            onchain_every_ticks: cfg.feed.onchain_every_ticks.max(1),
            stale_alert_minutes: cfg.feed.stale_alert_minutes,
            max_spread: cfg.feed.max_spread,
        })
    }
}

/// Per-market async locks so concurrent refreshes collapse into one
#[derive(Default)]
pub struct RefreshLocks {
    locks: Mutex<HashMap<Pubkey, Arc<tokio::sync::Mutex<()>>>>,
}

impl RefreshLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, market: &Pubkey) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(*market)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

struct FeedState {
    snapshot: OrderBookSnapshot,
    on_chain_mode: bool,
    ticks: u64,
    reconciler: SnapshotReconciler,
    token_prices: HashMap<String, f64>,
}

pub struct MarketFeed {
    details: Arc<MarketDetails>,
    on_chain: Arc<dyn MarketDataSource>,
    api: Option<Arc<dyn MarketDataSource>>,
    settings: FeedSettings,
    state: Mutex<FeedState>,
    refresh_lock: Arc<tokio::sync::Mutex<()>>,
}

impl MarketFeed {
    pub fn new(
        details: Arc<MarketDetails>,
        on_chain: Arc<dyn MarketDataSource>,
        api: Option<Arc<dyn MarketDataSource>>,
        settings: FeedSettings,
        locks: &RefreshLocks,
    ) -> Self {
        let refresh_lock = locks.lock_for(&details.address);
        Self {
            state: Mutex::new(FeedState {
                snapshot: OrderBookSnapshot::empty(),
                on_chain_mode: api.is_none(),
                ticks: 0,
                reconciler: SnapshotReconciler::new(settings.max_spread, settings.stale_alert_minutes),
                token_prices: HashMap::new(),
            }),
            details,
            on_chain,
            api,
            settings,
            refresh_lock,
        }
    }

    pub fn details(&self) -> &Arc<MarketDetails> {
        &self.details
    }

    pub fn snapshot(&self) -> OrderBookSnapshot {
        self.state.lock().snapshot.clone()
    }

    pub fn is_on_chain_mode(&self) -> bool {
        self.state.lock().on_chain_mode
    }

    pub fn alerts(&self) -> Vec<String> {
        self.state.lock().reconciler.alerts().to_vec()
    }

    pub fn token_prices(&self) -> HashMap<String, f64> {
        self.state.lock().token_prices.clone()
    }

    /// One refresh tick. Concurrent callers wait for the in-flight refresh
    /// and get its result instead of fetching again.
    pub async fn refresh(&self) -> Result<OrderBookSnapshot, SwapError> {
        let lock = self.refresh_lock.clone();
        let _guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                let _joined = lock.lock().await;
                return Ok(self.snapshot());
            }
        };

        let tick = {
            let mut state = self.state.lock();
            let tick = state.ticks;
            state.ticks += 1;
            tick
        };

        let mut refreshed = false;
        let mut last_error = None;

        if let Some(api) = &self.api {
            match api.fetch(&self.details).await {
                Ok(data) => {
                    self.apply(data);
                    self.set_on_chain_mode(false);
                    refreshed = true;
                }
                Err(e) => {
                    logger::warning(
                        LogTag::Market,
                        &format!("API refresh for {} failed: {}", self.details.name, e),
                    );
                    self.set_on_chain_mode(true);
                    last_error = Some(e);
                }
            }
        }

        let chain_due = match self.api {
            None => true,
            Some(_) => self.is_on_chain_mode() && tick % self.settings.onchain_every_ticks == 0,
        };

        if chain_due {
            match self.on_chain.fetch(&self.details).await {
                Ok(data) => {
                    self.apply(data);
                    refreshed = true;
                }
                Err(e) => {
                    logger::warning(
                        LogTag::Market,
                        &format!("On-chain refresh for {} failed: {}", self.details.name, e),
                    );
                    last_error = Some(e);
                }
            }
        }

        match (refreshed, last_error) {
            (false, Some(e)) => Err(e),
            _ => Ok(self.snapshot()),
        }
    }

    /// Fetch a fresh snapshot outside the cadence, chain first
    pub async fn fetch_live(&self) -> Result<OrderBookSnapshot, SwapError> {
        match self.on_chain.fetch(&self.details).await {
            Ok(data) => Ok(data.snapshot),
            Err(chain_err) => match &self.api {
                Some(api) => {
                    logger::debug(
                        LogTag::Market,
                        &format!("Live on-chain read failed ({}), asking API", chain_err),
                    );
                    api.fetch(&self.details).await.map(|data| data.snapshot)
                }
                None => Err(chain_err),
            },
        }
    }

    /// Run `refresh` on the configured cadence until the task is cancelled
    pub fn start(self: &Arc<Self>) -> ScheduledTask {
        let feed = Arc::clone(self);
        ScheduledTask::start(
            &format!("feed:{}", self.details.name),
            self.settings.refresh_interval,
            move || {
                let feed = feed.clone();
                async move {
                    if let Err(e) = feed.refresh().await {
                        logger::debug(LogTag::Market, &format!("Refresh skipped: {}", e));
                    }
                }
            },
        )
    }

    fn set_on_chain_mode(&self, on_chain: bool) {
        let mut state = self.state.lock();
        if state.on_chain_mode != on_chain {
            logger::info(
                LogTag::Market,
                &format!(
                    "{} market data for {}",
                    if on_chain { "Switching to on-chain" } else { "Back to API" },
                    self.details.name
                ),
            );
            state.on_chain_mode = on_chain;
        }
    }

    fn apply(&self, data: MarketData) {
        let mut state = self.state.lock();
        let state = &mut *state;
        let reconciled = state
            .reconciler
            .reconcile(&state.snapshot, data.snapshot, Utc::now());
        state.snapshot = reconciled.snapshot;
        state.token_prices.extend(data.token_prices);
    }
}
