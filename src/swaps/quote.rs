/// Quote engine: walks the order book to estimate a swap's output
use super::types::{Quote, Side};
use crate::constants::BUY_OUTPUT_STEP;
use crate::market::OrderBookSnapshot;
use std::fmt;

/// Estimate the output of swapping `input_amount` against `snapshot`.
///
/// Sells walk the bids with a base input, buys walk the asks with a quote
/// input. Zero, negative or non-finite input yields an empty quote.
pub fn compute_quote(snapshot: &OrderBookSnapshot, side: Side, input_amount: f64, margin: f64) -> Quote {
    if !input_amount.is_finite() || input_amount <= 0.0 {
        return Quote::default();
    }

    match side {
        Side::Sell => quote_sell(snapshot, input_amount, margin),
        Side::Buy => quote_buy(snapshot, input_amount, margin),
    }
}

fn quote_sell(snapshot: &OrderBookSnapshot, input_amount: f64, margin: f64) -> Quote {
    let mut remaining = input_amount;
    let mut value = 0.0;
    let mut total_volume = 0.0;
    let mut slots = 0;

    for level in snapshot.bids() {
        if remaining <= 0.0 {
            break;
        }
        value += remaining.min(level.quantity) * level.price;
        remaining -= level.quantity;
        total_volume += level.quantity;
        slots += 1;
    }

    let capped = remaining > 0.0;
    Quote {
        output_amount: value.min(snapshot.total_quote_quantity()) * (1.0 - margin),
        consumed_input: if capped { total_volume } else { input_amount },
        slots_consumed: slots,
        capped,
    }
}

fn quote_buy(snapshot: &OrderBookSnapshot, input_amount: f64, margin: f64) -> Quote {
    let mut remaining = input_amount;
    let mut value = 0.0;
    let mut total_cost = 0.0;
    let mut slots = 0;

    for level in snapshot.asks() {
        if remaining <= 0.0 {
            break;
        }
        let cost = level.quantity * level.price;
        if remaining > cost {
            value += level.quantity;
        } else if cost > 0.0 {
            value += remaining / cost * level.quantity;
        }
        remaining -= cost;
        total_cost += cost;
        slots += 1;
    }

    let capped = remaining > 0.0;
    let stepped = (value * (1.0 - margin) / BUY_OUTPUT_STEP).floor() * BUY_OUTPUT_STEP;
    Quote {
        output_amount: stepped.min(snapshot.total_base_quantity()),
        consumed_input: if capped { total_cost } else { input_amount },
        slots_consumed: slots,
        capped,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyGrade {
    Great,
    Good,
    Fair,
    Bad,
}

impl fmt::Display for AccuracyGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccuracyGrade::Great => "Great",
            AccuracyGrade::Good => "Good",
            AccuracyGrade::Fair => "Fair",
            AccuracyGrade::Bad => "Bad",
        };
        f.write_str(label)
    }
}

/// How far the quote is from reference prices, in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceAccuracy {
    pub percent: f64,
    pub grade: AccuracyGrade,
}

/// Compare the value given up against the value received at reference
/// prices. `None` when either side has no usable price.
pub fn price_accuracy(input: f64, input_price: f64, output: f64, output_price: f64) -> Option<PriceAccuracy> {
    let received = output * output_price;
    let given = input * input_price;
    if !received.is_finite() || received <= 0.0 || !given.is_finite() || given <= 0.0 {
        return None;
    }

    let percent = given / received * 100.0 - 100.0;
    let grade = if percent <= 0.0 {
        AccuracyGrade::Great
    } else if percent <= 1.0 {
        AccuracyGrade::Good
    } else if percent <= 2.0 {
        AccuracyGrade::Fair
    } else {
        AccuracyGrade::Bad
    };

    Some(PriceAccuracy { percent, grade })
}
