use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::DailyBar;

/// A cached daily price bar, one row of the `stock_prices` table
///
/// Prices are rounded to 2 decimals and volume is a whole share count.
/// `date` serializes as ISO-8601 (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PriceBar {
    pub id: i64,
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// A bar ready to be inserted; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewPriceBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl NewPriceBar {
    /// Normalize an upstream bar for storage under an already-uppercased symbol
    pub fn from_daily(symbol: &str, bar: &DailyBar) -> Self {
        Self {
            symbol: symbol.to_string(),
            date: bar.date,
            open: round_price(bar.open),
            high: round_price(bar.high),
            low: round_price(bar.low),
            close: round_price(bar.close),
            volume: coerce_volume(bar.volume),
        }
    }
}

/// Round a price to 2 decimal places
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Truncate a volume to a whole, non-negative share count
pub fn coerce_volume(value: f64) -> i64 {
    if value.is_finite() && value > 0.0 {
        value.trunc() as i64
    } else {
        0
    }
}

/// Trim and uppercase a ticker symbol; `None` when nothing is left
pub fn normalize_symbol(symbol: &str) -> Option<String> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}
