/// Snapshot reconciliation
///
/// Decides how much of an incoming snapshot replaces the cached one. A side
/// is only adopted when its best price moved and the incoming book has a sane
/// spread, so a half-updated or crossed feed never replaces good data.
use super::orderbook::OrderBookSnapshot;
use crate::logger::{self, LogTag};
use chrono::{DateTime, Duration, Utc};

/// Alert raised while the market feed lags behind
pub const STALE_PRICE_ALERT: &str = "Market data is delayed, quotes may not reflect the live book";

/// Which part of the incoming snapshot was adopted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adoption {
    Wholesale,
    BidsOnly,
    AsksOnly,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub snapshot: OrderBookSnapshot,
    pub adoption: Adoption,
}

#[derive(Debug, Clone)]
pub struct SnapshotReconciler {
    max_spread: f64,
    stale_after: Duration,
    alerts: Vec<String>,
}

impl SnapshotReconciler {
    pub fn new(max_spread: f64, stale_after_minutes: i64) -> Self {
        Self {
            max_spread,
            stale_after: Duration::minutes(stale_after_minutes),
            alerts: Vec::new(),
        }
    }

    /// Active alerts, deduplicated
    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn reconcile(
        &mut self,
        cached: &OrderBookSnapshot,
        incoming: OrderBookSnapshot,
        now: DateTime<Utc>,
    ) -> Reconciled {
        self.track_staleness(&incoming, now);

        if cached.has_empty_side() {
            return Reconciled {
                snapshot: incoming,
                adoption: Adoption::Wholesale,
            };
        }

        let spread_ok = incoming
            .spread()
            .map(|spread| spread < self.max_spread)
            .unwrap_or(false);

        let bid_moved = cached.highest_bid() == 0.0 || incoming.highest_bid() != cached.highest_bid();
        let ask_moved = cached.lowest_ask() == 0.0 || incoming.lowest_ask() != cached.lowest_ask();

        let update_bids = bid_moved && spread_ok;
        let update_asks = ask_moved && spread_ok;

        let (snapshot, adoption) = if update_bids && update_asks {
            (incoming, Adoption::Wholesale)
        } else if update_asks && incoming.lowest_ask() > 0.0 {
            (cached.with_asks(incoming.asks().to_vec()), Adoption::AsksOnly)
        } else if update_bids && incoming.highest_bid() > 0.0 {
            (cached.with_bids(incoming.bids().to_vec()), Adoption::BidsOnly)
        } else {
            (cached.clone(), Adoption::Unchanged)
        };

        if adoption != Adoption::Unchanged {
            logger::debug(
                LogTag::Market,
                &format!(
                    "Adopted {:?}: bid {:.10} ask {:.10}",
                    adoption,
                    snapshot.highest_bid(),
                    snapshot.lowest_ask()
                ),
            );
        }

        Reconciled { snapshot, adoption }
    }

    fn track_staleness(&mut self, incoming: &OrderBookSnapshot, now: DateTime<Utc>) {
        let is_stale = incoming.age(now) > self.stale_after;
        let active = self.alerts.iter().any(|a| a == STALE_PRICE_ALERT);

        if is_stale && !active {
            logger::warning(
                LogTag::Market,
                &format!(
                    "{} (snapshot from {})",
                    STALE_PRICE_ALERT,
                    incoming.updated_at().format("%H:%M:%S")
                ),
            );
            self.alerts.push(STALE_PRICE_ALERT.to_string());
        } else if !is_stale && active {
            logger::info(LogTag::Market, "Market data caught up, alert cleared");
            self.alerts.retain(|a| a != STALE_PRICE_ALERT);
        }
    }
}
