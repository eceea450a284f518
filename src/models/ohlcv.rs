use chrono::NaiveDate;

/// One daily OHLCV bar as returned by the upstream provider, before rounding
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    /// Exchange-local trading date
    pub date: NaiveDate,

    /// Opening price
    pub open: f64,

    /// Highest price
    pub high: f64,

    /// Lowest price
    pub low: f64,

    /// Closing price
    pub close: f64,

    /// Trading volume, may be fractional or missing upstream
    pub volume: f64,
}

impl DailyBar {
    /// Create a new daily bar
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Scale the OHLC prices by a split/dividend adjustment factor
    pub fn adjusted(mut self, factor: f64) -> Self {
        self.open *= factor;
        self.high *= factor;
        self.low *= factor;
        self.close *= factor;
        self
    }
}
