use crate::error::Error;
use crate::models::{normalize_symbol, PriceBar, ServerConfig};
use crate::services::PriceStore;

pub async fn run(config: ServerConfig, symbol: String) {
    match load(config, &symbol).await {
        Ok((symbol, rows)) if rows.is_empty() => {
            println!("⚠️  No data found for {}. Run 'fetch {}' first.", symbol, symbol);
        }
        Ok((symbol, rows)) => {
            println!("📈 {} ({} records)\n", symbol, rows.len());
            print_rows(&rows);
        }
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn load(config: ServerConfig, symbol: &str) -> Result<(String, Vec<PriceBar>), Error> {
    let symbol = normalize_symbol(symbol)
        .ok_or_else(|| Error::InvalidInput("Symbol must not be empty".to_string()))?;

    let store = PriceStore::new(config.database_path).await?;
    let rows = store.get_by_symbol(&symbol).await;
    store.close().await;
    Ok((symbol, rows?))
}

fn print_rows(rows: &[PriceBar]) {
    println!(
        "   {:<10} {:>10} {:>10} {:>10} {:>10} {:>14}",
        "Date", "Open", "High", "Low", "Close", "Volume"
    );
    for row in rows {
        println!(
            "   {:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>14}",
            row.date.format("%Y-%m-%d"),
            row.open,
            row.high,
            row.low,
            row.close,
            format_number(row.volume)
        );
    }
}

/// Thousands separators for display
pub fn format_number(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}
