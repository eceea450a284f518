use crate::error::AppError;
use crate::models::PriceBar;
use crate::services::PriceSync;
use crate::utils::elapsed_ms;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Body of GET /api/stocks/{symbol}
#[derive(Debug, Serialize, Deserialize)]
pub struct StockDataResponse {
    pub symbol: String,
    pub data: Vec<PriceBar>,
}

/// Body of POST /api/stocks/fetch/{symbol}
#[derive(Debug, Serialize, Deserialize)]
pub struct FetchResponse {
    pub message: String,
    pub records_added: usize,
}

/// GET / - Static welcome message
pub async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Welcome to Mini-Quant API" }))
}

/// GET /api/health - Liveness probe
pub async fn health_handler() -> impl IntoResponse {
    // No logging here (too noisy)
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/stocks/{symbol} - Cached bars for a symbol, never touches the provider
///
/// Examples:
/// - /api/stocks/AAPL
/// - /api/stocks/aapl (symbol is uppercased)
#[instrument(skip(sync))]
pub async fn get_stock_handler(
    State(sync): State<PriceSync>,
    Path(symbol): Path<String>,
) -> Response {
    let start = Instant::now();
    debug!("Received request for cached bars");

    match sync.cached_bars(&symbol).await {
        Ok((symbol, data)) => {
            info!(
                symbol = %symbol,
                records = data.len(),
                elapsed_ms = elapsed_ms(start),
                "Returning cached bars"
            );
            (StatusCode::OK, Json(StockDataResponse { symbol, data })).into_response()
        }
        Err(e) => log_failure("read", e).into_response(),
    }
}

/// POST /api/stocks/fetch/{symbol} - Refresh the cached window from the provider
#[instrument(skip(sync))]
pub async fn fetch_stock_handler(
    State(sync): State<PriceSync>,
    Path(symbol): Path<String>,
) -> Response {
    let start = Instant::now();
    debug!("Received refresh request");

    match sync.sync_symbol(&symbol).await {
        Ok(report) => {
            info!(
                symbol = %report.symbol,
                records_added = report.records_added,
                elapsed_ms = elapsed_ms(start),
                "Refresh completed"
            );
            let body = FetchResponse {
                message: format!("Successfully fetched and stored data for {}", report.symbol),
                records_added: report.records_added,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => log_failure("refresh", e).into_response(),
    }
}

fn log_failure(operation: &str, err: AppError) -> AppError {
    match &err {
        AppError::NotFound(_) | AppError::InvalidInput(_) => {
            warn!(operation, error = %err, "Request rejected");
        }
        _ => {
            error!(operation, error = %err, "Request failed");
        }
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{build_router, AppState};
    use crate::services::provider::mock::{trading_days, MockProvider};
    use crate::services::PriceStore;
    use axum::{body::Body, http::Request, Router};
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    async fn test_app(provider: Arc<MockProvider>) -> (Router, TempDir) {
        let temp_dir = tempdir().unwrap();
        let store = PriceStore::new(temp_dir.path().join("test.db")).await.unwrap();
        let sync = PriceSync::new(provider, store, 30);
        (build_router(AppState { sync }), temp_dir)
    }

    async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let (app, _dir) = test_app(Arc::new(MockProvider::default())).await;

        let (status, body) = send(&app, "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to Mini-Quant API");

        let (status, body) = send(&app, "GET", "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_fetch_then_read() {
        let (app, _dir) = test_app(Arc::new(MockProvider::with_bars(trading_days(21)))).await;

        let (status, body) = send(&app, "POST", "/api/stocks/fetch/aapl").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records_added"], 21);
        assert_eq!(body["message"], "Successfully fetched and stored data for AAPL");

        let (status, body) = send(&app, "GET", "/api/stocks/AAPL").await;
        assert_eq!(status, StatusCode::OK);
        let response: StockDataResponse = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(response.symbol, "AAPL");
        assert_eq!(response.data.len(), 21);
        assert!(response.data.iter().all(|bar| bar.symbol == "AAPL"));

        let first = &body["data"][0];
        for field in ["id", "symbol", "date", "open", "high", "low", "close", "volume"] {
            assert!(first.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(first["date"], "2024-03-01");
    }

    #[tokio::test]
    async fn test_refetch_replaces() {
        let provider = Arc::new(MockProvider::with_bars(trading_days(21)));
        let (app, _dir) = test_app(provider.clone()).await;

        send(&app, "POST", "/api/stocks/fetch/AAPL").await;
        provider.set_bars(trading_days(20));
        let (_, body) = send(&app, "POST", "/api/stocks/fetch/AAPL").await;
        assert_eq!(body["records_added"], 20);

        let (_, body) = send(&app, "GET", "/api/stocks/AAPL").await;
        assert_eq!(body["data"].as_array().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_read_unknown_symbol_404() {
        let (app, _dir) = test_app(Arc::new(MockProvider::default())).await;

        let (status, body) = send(&app, "GET", "/api/stocks/ZZZZ").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "No data found for this symbol");
    }

    #[tokio::test]
    async fn test_fetch_without_upstream_data_404() {
        let (app, _dir) = test_app(Arc::new(MockProvider::with_bars(Vec::new()))).await;

        let (status, body) = send(&app, "POST", "/api/stocks/fetch/ZZZZ").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Symbol not found");
    }

    #[tokio::test]
    async fn test_fetch_upstream_failure_500() {
        let provider = Arc::new(MockProvider::default());
        provider.set_failure("upstream timed out");
        let (app, _dir) = test_app(provider).await;

        let (status, body) = send(&app, "POST", "/api/stocks/fetch/AAPL").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("upstream timed out"));
    }

    #[tokio::test]
    async fn test_blank_symbol_400() {
        let (app, _dir) = test_app(Arc::new(MockProvider::default())).await;

        let (status, _) = send(&app, "GET", "/api/stocks/%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_fetch_requires_post() {
        let (app, _dir) = test_app(Arc::new(MockProvider::with_bars(trading_days(3)))).await;

        let (status, _) = send(&app, "GET", "/api/stocks/fetch/AAPL").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
