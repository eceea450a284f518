use chrono::{Duration, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::{normalize_symbol, NewPriceBar, PriceBar};
use crate::services::price_store::PriceStore;
use crate::services::provider::PriceProvider;
use crate::utils::deduplication::{count_duplicates, dedup_by_date};
use crate::utils::elapsed_ms;

/// Detail returned when the provider has nothing for a symbol
pub const UPSTREAM_NOT_FOUND: &str = "Symbol not found";

/// Detail returned when the store has nothing for a symbol
pub const CACHE_NOT_FOUND: &str = "No data found for this symbol";

/// Outcome of one refresh
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Uppercased symbol the rows were stored under
    pub symbol: String,
    /// Rows written by the refresh
    pub records_added: usize,
}

/// Fetch-and-replace synchronization between the provider and the store
#[derive(Clone)]
pub struct PriceSync {
    provider: Arc<dyn PriceProvider>,
    store: PriceStore,
    history_days: u32,
}

impl PriceSync {
    pub fn new(provider: Arc<dyn PriceProvider>, store: PriceStore, history_days: u32) -> Self {
        Self {
            provider,
            store,
            history_days,
        }
    }

    pub fn store(&self) -> &PriceStore {
        &self.store
    }

    /// Refresh the cached window of `symbol` from the provider
    ///
    /// Returns `NotFound` when the provider has no bars. Otherwise the cached
    /// rows are replaced in one transaction; on failure the old rows remain.
    pub async fn sync_symbol(&self, symbol: &str) -> Result<SyncReport, AppError> {
        let symbol = require_symbol(symbol)?;
        let start_time = Instant::now();

        let end = Utc::now();
        let start = end - Duration::days(i64::from(self.history_days));

        debug!(
            symbol = %symbol,
            provider = self.provider.name(),
            history_days = self.history_days,
            "Requesting daily bars"
        );

        let bars = self.provider.fetch_daily_bars(&symbol, start, end).await?;
        if bars.is_empty() {
            info!(symbol = %symbol, "Provider returned no data");
            return Err(AppError::NotFound(UPSTREAM_NOT_FOUND.to_string()));
        }

        let duplicates = count_duplicates(&bars);
        if duplicates > 0 {
            warn!(symbol = %symbol, duplicates, "Provider returned repeated dates, keeping last");
        }

        let rows: Vec<NewPriceBar> = dedup_by_date(bars, true)
            .iter()
            .map(|bar| NewPriceBar::from_daily(&symbol, bar))
            .collect();

        let records_added = self.store.replace_symbol(&symbol, &rows).await?;

        info!(
            symbol = %symbol,
            records_added,
            elapsed_ms = elapsed_ms(start_time),
            "Refreshed cached bars"
        );

        Ok(SyncReport {
            symbol,
            records_added,
        })
    }

    /// Cached bars for `symbol`; `NotFound` when nothing is cached
    pub async fn cached_bars(&self, symbol: &str) -> Result<(String, Vec<PriceBar>), AppError> {
        let symbol = require_symbol(symbol)?;
        let rows = self.store.get_by_symbol(&symbol).await?;

        if rows.is_empty() {
            return Err(AppError::NotFound(CACHE_NOT_FOUND.to_string()));
        }

        Ok((symbol, rows))
    }
}

fn require_symbol(symbol: &str) -> Result<String, AppError> {
    normalize_symbol(symbol).ok_or_else(|| AppError::InvalidInput("Symbol must not be empty".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DailyBar;
    use crate::services::provider::mock::{trading_days, MockProvider};
    use chrono::NaiveDate;
    use tempfile::{tempdir, TempDir};

    async fn setup(provider: Arc<MockProvider>) -> (PriceSync, TempDir) {
        let temp_dir = tempdir().unwrap();
        let store = PriceStore::new(temp_dir.path().join("test.db")).await.unwrap();
        (PriceSync::new(provider, store, 30), temp_dir)
    }

    #[tokio::test]
    async fn test_sync_then_read_matches_count() {
        let provider = Arc::new(MockProvider::with_bars(trading_days(21)));
        let (sync, _dir) = setup(provider.clone()).await;

        let report = sync.sync_symbol("AAPL").await.unwrap();
        assert_eq!(report.records_added, 21);
        assert_eq!(report.symbol, "AAPL");

        let (symbol, rows) = sync.cached_bars("AAPL").await.unwrap();
        assert_eq!(symbol, "AAPL");
        assert_eq!(rows.len(), 21);
        assert!(rows.iter().all(|r| r.symbol == "AAPL"));
    }

    #[tokio::test]
    async fn test_resync_replaces_rows() {
        let provider = Arc::new(MockProvider::with_bars(trading_days(21)));
        let (sync, _dir) = setup(provider.clone()).await;

        sync.sync_symbol("AAPL").await.unwrap();
        provider.set_bars(trading_days(19));
        let report = sync.sync_symbol("AAPL").await.unwrap();

        assert_eq!(report.records_added, 19);
        let (_, rows) = sync.cached_bars("AAPL").await.unwrap();
        assert_eq!(rows.len(), 19);
    }

    #[tokio::test]
    async fn test_empty_provider_is_not_found() {
        let provider = Arc::new(MockProvider::with_bars(Vec::new()));
        let (sync, _dir) = setup(provider).await;

        let err = sync.sync_symbol("NOPE").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref msg) if msg == UPSTREAM_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_empty_provider_keeps_existing_rows() {
        let provider = Arc::new(MockProvider::with_bars(trading_days(5)));
        let (sync, _dir) = setup(provider.clone()).await;

        sync.sync_symbol("AAPL").await.unwrap();
        provider.set_bars(Vec::new());
        assert!(sync.sync_symbol("AAPL").await.is_err());

        assert_eq!(sync.store().count_by_symbol("AAPL").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_existing_rows() {
        let provider = Arc::new(MockProvider::with_bars(trading_days(5)));
        let (sync, _dir) = setup(provider.clone()).await;

        sync.sync_symbol("AAPL").await.unwrap();
        provider.set_failure("connection reset by peer");

        let err = sync.sync_symbol("AAPL").await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
        assert!(err.to_string().contains("connection reset by peer"));
        assert_eq!(sync.store().count_by_symbol("AAPL").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_symbol_is_uppercased() {
        let provider = Arc::new(MockProvider::with_bars(trading_days(3)));
        let (sync, _dir) = setup(provider.clone()).await;

        let report = sync.sync_symbol(" msft ").await.unwrap();
        assert_eq!(report.symbol, "MSFT");
        assert_eq!(provider.requests.lock().unwrap().as_slice(), ["MSFT"]);

        let (symbol, rows) = sync.cached_bars("msft").await.unwrap();
        assert_eq!(symbol, "MSFT");
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_prices_rounded_and_volume_whole() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let provider = Arc::new(MockProvider::with_bars(vec![DailyBar::new(
            date, 179.5512, 180.5349, 177.3801, 179.6612, 73_488_000.9,
        )]));
        let (sync, _dir) = setup(provider).await;

        sync.sync_symbol("AAPL").await.unwrap();
        let (_, rows) = sync.cached_bars("AAPL").await.unwrap();

        let row = &rows[0];
        assert_eq!((row.open, row.high, row.low, row.close), (179.55, 180.53, 177.38, 179.66));
        assert_eq!(row.volume, 73_488_000);
        for price in [row.open, row.high, row.low, row.close] {
            assert_eq!((price * 100.0).round() / 100.0, price);
        }
    }

    #[tokio::test]
    async fn test_duplicate_dates_collapsed() {
        let mut bars = trading_days(4);
        let mut repeat = bars[3].clone();
        repeat.close += 1.0;
        bars.push(repeat);

        let provider = Arc::new(MockProvider::with_bars(bars));
        let (sync, _dir) = setup(provider).await;

        let report = sync.sync_symbol("AAPL").await.unwrap();
        assert_eq!(report.records_added, 4);

        let (_, rows) = sync.cached_bars("AAPL").await.unwrap();
        assert_eq!(rows.len(), report.records_added);
    }

    #[tokio::test]
    async fn test_read_unsynced_symbol_is_not_found() {
        let provider = Arc::new(MockProvider::default());
        let (sync, _dir) = setup(provider.clone()).await;

        let err = sync.cached_bars("TSLA").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref msg) if msg == CACHE_NOT_FOUND));
        // The read path never calls the provider
        assert!(provider.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_symbol_rejected() {
        let provider = Arc::new(MockProvider::with_bars(trading_days(3)));
        let (sync, _dir) = setup(provider).await;

        assert!(matches!(sync.sync_symbol("  ").await, Err(AppError::InvalidInput(_))));
        assert!(matches!(sync.cached_bars("").await, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_do_not_duplicate() {
        let provider = Arc::new(MockProvider::with_bars(trading_days(10)));
        let (sync, _dir) = setup(provider).await;

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let sync = sync.clone();
                tokio::spawn(async move { sync.sync_symbol("AAPL").await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().records_added, 10);
        }

        assert_eq!(sync.store().count_by_symbol("AAPL").await.unwrap(), 10);
    }
}
