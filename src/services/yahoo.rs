//! Yahoo Finance chart API client
//!
//! Fetches daily OHLCV history from the public `v8/finance/chart` endpoint.
//!
//! - Prices are split/dividend adjusted using the `adjclose` series when present
//! - Bar dates are exchange-local, derived from `meta.gmtoffset`
//! - Padding rows with null prices are dropped
//! - An unknown symbol (HTTP 404 or a `Not Found` chart error) yields no bars
//!
//! No retry and no rate limiting: a refresh is one request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::DailyBar;
use crate::services::provider::PriceProvider;

/// Yahoo rejects requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Chart error code Yahoo uses for unknown or delisted symbols
const NOT_FOUND_CODE: &str = "Not Found";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
    #[serde(default)]
    adjclose: Vec<AdjCloseSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct AdjCloseSeries {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Client for the Yahoo Finance chart API
pub struct YahooClient {
    base_url: Url,
    client: reqwest::Client,
}

impl YahooClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. "https://query1.finance.yahoo.com"
    /// * `timeout` - Optional request timeout; `None` waits as long as the server does
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/');

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Invalid provider base URL: must start with http:// or https://, got: '{}'",
                base_url
            )));
        }

        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("Invalid provider base URL '{}': {}", base_url, e)))?;

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        info!(base_url = %base_url, ?timeout, "Created YahooClient");

        Ok(Self { base_url, client })
    }

    /// Build the chart URL; the symbol is percent-encoded as a path segment
    fn chart_url(&self, symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("Provider base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);

        url.query_pairs_mut()
            .append_pair("period1", &start.timestamp().to_string())
            .append_pair("period2", &end.timestamp().to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "div|split");

        Ok(url)
    }
}

#[async_trait]
impl PriceProvider for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DailyBar>, AppError> {
        let url = self.chart_url(symbol, start, end)?;
        debug!(%url, symbol, "Fetching daily bars from Yahoo Finance");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Yahoo Finance request failed for {}: {}", symbol, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read Yahoo Finance response: {}", e)))?;

        if status == StatusCode::NOT_FOUND {
            debug!(symbol, "Yahoo Finance returned 404");
            return Ok(Vec::new());
        }

        if !status.is_success() {
            warn!(symbol, %status, "Yahoo Finance returned error status");
            return Err(AppError::Network(format!(
                "Yahoo Finance returned error status {}: {}",
                status, body
            )));
        }

        let bars = parse_chart(&body)?;
        debug!(symbol, bars = bars.len(), "Parsed Yahoo Finance chart");
        Ok(bars)
    }
}

fn value_at(series: &[Option<f64>], i: usize) -> Option<f64> {
    series.get(i).copied().flatten()
}

/// Decode a chart response body into daily bars
pub fn parse_chart(body: &str) -> Result<Vec<DailyBar>, AppError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| AppError::Parse(format!("Failed to parse Yahoo Finance response: {}", e)))?;

    if let Some(error) = envelope.chart.error {
        if error.code == NOT_FOUND_CODE {
            return Ok(Vec::new());
        }
        return Err(AppError::Network(format!(
            "Yahoo Finance error {}: {}",
            error.code,
            error.description.unwrap_or_default()
        )));
    }

    let Some(result) = envelope.chart.result.and_then(|results| results.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let Some(quote) = result.indicators.quote.first() else {
        return Ok(Vec::new());
    };
    let adjclose = result.indicators.adjclose.first().map(|a| a.adjclose.as_slice());

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &timestamp) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            value_at(&quote.open, i),
            value_at(&quote.high, i),
            value_at(&quote.low, i),
            value_at(&quote.close, i),
        ) else {
            continue;
        };

        let Some(local) = DateTime::from_timestamp(timestamp + result.meta.gmtoffset, 0) else {
            return Err(AppError::Parse(format!("Timestamp out of range: {}", timestamp)));
        };

        let volume = value_at(&quote.volume, i).unwrap_or(0.0);
        let mut bar = DailyBar::new(local.date_naive(), open, high, low, close, volume);

        if let Some(adj) = adjclose.and_then(|series| value_at(series, i)) {
            if close != 0.0 {
                bar = bar.adjusted(adj / close);
            }
        }

        bars.push(bar);
    }

    Ok(bars)
}
