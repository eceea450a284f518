use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::DailyBar;

/// Source of daily price history for the sync routine
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Provider name used in log lines
    fn name(&self) -> &'static str;

    /// Daily bars for `symbol` between `start` and `end`, oldest first
    ///
    /// An unknown symbol or an empty window is `Ok(vec![])`; errors are reserved
    /// for transport and decoding failures.
    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DailyBar>, AppError>;
}
