use crate::commands::show::format_number;
use crate::error::Error;
use crate::models::ServerConfig;
use crate::services::{PriceStore, StoreStats};

pub async fn run(config: ServerConfig) {
    println!("📊 Price Cache Status\n");
    println!("📁 Database: {}\n", config.database_path.display());

    match load_stats(config).await {
        Ok(stats) => print_stats(&stats),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn load_stats(config: ServerConfig) -> Result<StoreStats, Error> {
    let store = PriceStore::new(config.database_path).await?;
    let stats = store.get_stats().await;
    store.close().await;
    stats
}

fn print_stats(stats: &StoreStats) {
    if stats.total_records == 0 {
        println!("⚠️  No cached data. Run 'fetch <SYMBOL>' first.");
        return;
    }

    println!("📈 Symbols: {}", stats.unique_symbols);
    println!("📅 Records: {}", format_number(stats.total_records));
    if let Some((first, last)) = &stats.date_range {
        println!("🗓️  Range:   {} → {}", first, last);
    }

    println!("\n═══════════════════════════════════════════════════════════\n");
    for (symbol, count) in &stats.per_symbol {
        println!("   {:<12} {:>8} records", symbol, format_number(*count));
    }
}
