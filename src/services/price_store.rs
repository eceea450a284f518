use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use std::path::PathBuf;
use std::time::Duration;
use crate::error::AppError;
use crate::models::{NewPriceBar, PriceBar};
use tracing::{debug, info};

/// SQLite-backed cache of daily price bars
#[derive(Debug, Clone)]
pub struct PriceStore {
    pool: SqlitePool,
}

impl PriceStore {
    /// Open (or create) the database file and make sure the schema exists
    pub async fn new(database_path: PathBuf) -> Result<Self, AppError> {
        info!("Initializing SQLite database at: {:?}", database_path);

        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(&database_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Concurrent refreshes queue on the write lock instead of failing
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePool::connect_with(connect_options).await?;

        let store = Self { pool };
        store.initialize_database().await?;

        info!("SQLite database initialized successfully");
        Ok(store)
    }

    async fn initialize_database(&self) -> Result<(), sqlx::Error> {
        // No uniqueness on (symbol, date): the replace transaction keeps rows unique
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stock_prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                date DATE NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_stock_prices_symbol_date ON stock_prices(symbol, date)")
            .execute(&self.pool)
            .await?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// All cached bars for an uppercased symbol, by date
    pub async fn get_by_symbol(&self, symbol: &str) -> Result<Vec<PriceBar>, AppError> {
        let rows = sqlx::query_as::<_, PriceBar>(
            r#"
            SELECT id, symbol, date, open, high, low, close, volume
            FROM stock_prices
            WHERE symbol = ?1
            ORDER BY date ASC, id ASC
            "#,
        )
        .bind(symbol)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Replace every cached bar of `symbol` with `bars` in one transaction
    ///
    /// If any statement fails the transaction is dropped uncommitted and the
    /// previously cached rows survive.
    pub async fn replace_symbol(&self, symbol: &str, bars: &[NewPriceBar]) -> Result<usize, AppError> {
        let mut transaction = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM stock_prices WHERE symbol = ?1")
            .bind(symbol)
            .execute(&mut *transaction)
            .await?
            .rows_affected();

        let mut inserted = 0;
        for bar in bars {
            let result = sqlx::query(
                r#"
                INSERT INTO stock_prices (symbol, date, open, high, low, close, volume)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&bar.symbol)
            .bind(bar.date)
            .bind(bar.open)
            .bind(bar.high)
            .bind(bar.low)
            .bind(bar.close)
            .bind(bar.volume)
            .execute(&mut *transaction)
            .await?;

            inserted += result.rows_affected() as usize;
        }

        transaction.commit().await?;

        debug!(symbol, deleted, inserted, "Replaced cached bars");
        Ok(inserted)
    }

    pub async fn count_by_symbol(&self, symbol: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM stock_prices WHERE symbol = ?1")
            .bind(symbol)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Store-wide statistics for the status command
    pub async fn get_stats(&self) -> Result<StoreStats, AppError> {
        let total_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_prices")
            .fetch_one(&self.pool)
            .await?;

        let row = sqlx::query("SELECT MIN(date) AS first_date, MAX(date) AS last_date FROM stock_prices")
            .fetch_one(&self.pool)
            .await?;
        let first: Option<String> = row.try_get("first_date")?;
        let last: Option<String> = row.try_get("last_date")?;
        let date_range = first.zip(last);

        let per_symbol = sqlx::query(
            "SELECT symbol, COUNT(*) AS records FROM stock_prices GROUP BY symbol ORDER BY symbol",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| -> Result<(String, i64), sqlx::Error> {
            Ok((row.try_get("symbol")?, row.try_get("records")?))
        })
        .collect::<Result<Vec<_>, _>>()?;

        Ok(StoreStats {
            total_records,
            unique_symbols: per_symbol.len(),
            date_range,
            per_symbol,
        })
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
        info!("SQLite database connection pool closed");
    }
}

/// Database statistics
#[derive(Debug)]
pub struct StoreStats {
    pub total_records: i64,
    pub unique_symbols: usize,
    pub date_range: Option<(String, String)>,
    pub per_symbol: Vec<(String, i64)>,
}
