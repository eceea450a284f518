use std::sync::Arc;

use crate::error::Error;
use crate::models::{normalize_symbol, ServerConfig};
use crate::services::{PriceStore, PriceSync, SyncReport, YahooClient};

pub async fn run(config: ServerConfig, symbol: String) {
    let Some(symbol) = normalize_symbol(&symbol) else {
        eprintln!("❌ Symbol must not be empty");
        std::process::exit(1);
    };

    println!("{}", banner(config.history_days, &symbol));

    match fetch(config, &symbol).await {
        Ok(report) => {
            println!("✅ Stored {} records for {}", report.records_added, report.symbol);
        }
        Err(Error::NotFound(msg)) => {
            eprintln!("⚠️  {}: {}", symbol, msg);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("❌ Fetch failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn banner(history_days: u32, symbol: &str) -> String {
    format!("📥 Fetching {} day window for {}...", history_days, symbol)
}

async fn fetch(config: ServerConfig, symbol: &str) -> Result<SyncReport, Error> {
    let store = PriceStore::new(config.database_path.clone()).await?;
    let provider = Arc::new(YahooClient::new(&config.provider_base_url, config.provider_timeout)?);
    let sync = PriceSync::new(provider, store.clone(), config.history_days);

    let result = sync.sync_symbol(symbol).await;
    store.close().await;
    result
}
