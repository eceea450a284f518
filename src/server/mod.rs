pub mod api;

use crate::error::AppError;
use crate::models::ServerConfig;
use crate::services::{PriceStore, PriceSync, YahooClient};
use axum::{
    extract::FromRef,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tracing::{info, warn};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub sync: PriceSync,
}

impl FromRef<AppState> for PriceSync {
    fn from_ref(app_state: &AppState) -> PriceSync {
        app_state.sync.clone()
    }
}

/// Routes without middleware
pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(api::root_handler))
        .route("/api/health", get(api::health_handler))
        .route("/api/stocks/{symbol}", get(api::get_stock_handler))
        .route("/api/stocks/fetch/{symbol}", post(api::fetch_stock_handler))
        .with_state(app_state)
}

/// CORS for the configured frontend origins; wildcard and unparsable origins are skipped
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            // A wildcard is not allowed alongside credentials
            Ok(value) if value == "*" => {
                warn!(origin = %origin, "Ignoring wildcard CORS origin");
                None
            }
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
}

/// Start the axum server
pub async fn serve(config: ServerConfig) -> Result<(), AppError> {
    info!("Starting miniquant server");

    let store = PriceStore::new(config.database_path.clone()).await?;
    let provider = Arc::new(YahooClient::new(&config.provider_base_url, config.provider_timeout)?);
    let sync = PriceSync::new(provider, store.clone(), config.history_days);

    info!("Registering routes:");
    info!("  GET  /");
    info!("  GET  /api/health");
    info!("  GET  /api/stocks/{{symbol}}");
    info!("  POST /api/stocks/fetch/{{symbol}}");
    info!(origins = ?config.cors_origins, "CORS origins");

    let app = build_router(AppState { sync }).layer(cors_layer(&config.cors_origins));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
