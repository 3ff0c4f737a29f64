/// Order book snapshot with L2 depth per side
///
/// Levels are kept sorted (bids descending, asks ascending) and every
/// aggregate is recomputed from the levels whenever a side changes. Fields
/// are private so aggregates cannot drift from the levels they describe.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One aggregated price level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub quantity: f64,
}

impl Level {
    pub fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }
}

impl From<(f64, f64)> for Level {
    fn from((price, quantity): (f64, f64)) -> Self {
        Self { price, quantity }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBookSnapshot {
    bids: Vec<Level>,
    asks: Vec<Level>,
    total_base_quantity: f64,
    total_quote_quantity: f64,
    highest_bid: f64,
    highest_bid_quantity: f64,
    lowest_ask: f64,
    lowest_ask_quantity: f64,
    updated_at: DateTime<Utc>,
}

impl OrderBookSnapshot {
    /// Build a snapshot, sorting levels and dropping unusable ones
    pub fn new(bids: Vec<Level>, asks: Vec<Level>, updated_at: DateTime<Utc>) -> Self {
        let mut snapshot = Self {
            bids: Vec::new(),
            asks: Vec::new(),
            total_base_quantity: 0.0,
            total_quote_quantity: 0.0,
            highest_bid: 0.0,
            highest_bid_quantity: 0.0,
            lowest_ask: 0.0,
            lowest_ask_quantity: 0.0,
            updated_at,
        };
        snapshot.set_bids(bids);
        snapshot.set_asks(asks);
        snapshot
    }

    /// Snapshot with no depth on either side
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Copy of this snapshot with the bid side replaced
    pub fn with_bids(&self, bids: Vec<Level>) -> Self {
        let mut next = self.clone();
        next.set_bids(bids);
        next
    }

    /// Copy of this snapshot with the ask side replaced
    pub fn with_asks(&self, asks: Vec<Level>) -> Self {
        let mut next = self.clone();
        next.set_asks(asks);
        next
    }

    fn set_bids(&mut self, bids: Vec<Level>) {
        let mut bids = sanitize(bids);
        bids.sort_by(|a, b| b.price.partial_cmp(&a.price).unwrap_or(Ordering::Equal));

        self.total_quote_quantity = bids.iter().map(|l| l.price * l.quantity).sum();
        self.highest_bid = bids.first().map(|l| l.price).unwrap_or(0.0);
        self.highest_bid_quantity = bids.first().map(|l| l.quantity).unwrap_or(0.0);
        self.bids = bids;
    }

    fn set_asks(&mut self, asks: Vec<Level>) {
        let mut asks = sanitize(asks);
        asks.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal));

        self.total_base_quantity = asks.iter().map(|l| l.quantity).sum();
        self.lowest_ask = asks.first().map(|l| l.price).unwrap_or(0.0);
        self.lowest_ask_quantity = asks.first().map(|l| l.quantity).unwrap_or(0.0);
        self.asks = asks;
    }

    pub fn bids(&self) -> &[Level] {
        &self.bids
    }

    pub fn asks(&self) -> &[Level] {
        &self.asks
    }

    /// Sum of ask quantities, in base units
    pub fn total_base_quantity(&self) -> f64 {
        self.total_base_quantity
    }

    /// Sum of bid price × quantity, in quote units
    pub fn total_quote_quantity(&self) -> f64 {
        self.total_quote_quantity
    }

    pub fn highest_bid(&self) -> f64 {
        self.highest_bid
    }

    pub fn highest_bid_quantity(&self) -> f64 {
        self.highest_bid_quantity
    }

    pub fn lowest_ask(&self) -> f64 {
        self.lowest_ask
    }

    pub fn lowest_ask_quantity(&self) -> f64 {
        self.lowest_ask_quantity
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.updated_at
    }

    /// Both sides carry a positive best price
    pub fn has_top_of_book(&self) -> bool {
        self.highest_bid > 0.0 && self.lowest_ask > 0.0
    }

    pub fn has_empty_side(&self) -> bool {
        self.bids.is_empty() || self.asks.is_empty()
    }

    /// Relative spread `(ask − bid) / ask`, `None` without a positive ask
    pub fn spread(&self) -> Option<f64> {
        if self.lowest_ask > 0.0 {
            Some((self.lowest_ask - self.highest_bid) / self.lowest_ask)
        } else {
            None
        }
    }
}

impl Default for OrderBookSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

fn sanitize(levels: Vec<Level>) -> Vec<Level> {
    levels
        .into_iter()
        .filter(|l| l.price.is_finite() && l.quantity.is_finite() && l.quantity > 0.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(list: &[(f64, f64)]) -> Vec<Level> {
        list.iter().copied().map(Level::from).collect()
    }

    #[test]
    fn test_construction_sorts_and_aggregates() {
        let snapshot = OrderBookSnapshot::new(
            levels(&[(0.99, 1000.0), (1.00, 500.0)]),
            levels(&[(1.03, 10.0), (1.01, 20.0)]),
            Utc::now(),
        );

        assert_eq!(snapshot.bids()[0].price, 1.00);
        assert_eq!(snapshot.asks()[0].price, 1.01);
        assert_eq!(snapshot.highest_bid(), 1.00);
        assert_eq!(snapshot.highest_bid_quantity(), 500.0);
        assert_eq!(snapshot.lowest_ask(), 1.01);
        assert_eq!(snapshot.lowest_ask_quantity(), 20.0);
        assert_eq!(snapshot.total_base_quantity(), 30.0);
        assert!((snapshot.total_quote_quantity() - 1490.0).abs() < 1e-9);
    }

    #[test]
    fn test_side_replacement_recomputes_aggregates() {
        let snapshot = OrderBookSnapshot::new(
            levels(&[(1.0, 10.0)]),
            levels(&[(1.1, 10.0)]),
            Utc::now(),
        );
        let next = snapshot.with_asks(levels(&[(1.2, 4.0), (1.3, 6.0)]));

        assert_eq!(next.lowest_ask(), 1.2);
        assert_eq!(next.total_base_quantity(), 10.0);
        assert_eq!(next.highest_bid(), 1.0);
        assert_eq!(next.updated_at(), snapshot.updated_at());
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = OrderBookSnapshot::empty();
        assert!(snapshot.has_empty_side());
        assert!(!snapshot.has_top_of_book());
        assert_eq!(snapshot.spread(), None);
    }

    #[test]
    fn test_zero_quantity_levels_dropped() {
        let snapshot = OrderBookSnapshot::new(
            levels(&[(1.0, 0.0), (0.9, 5.0)]),
            Vec::new(),
            Utc::now(),
        );
        assert_eq!(snapshot.bids().len(), 1);
        assert_eq!(snapshot.highest_bid(), 0.9);
    }
}
