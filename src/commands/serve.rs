use crate::models::ServerConfig;
use crate::server;

pub async fn run(config: ServerConfig) {
    println!("🚀 Starting miniquant server on port {}", config.port);
    println!("📁 Database: {}", config.database_path.display());
    println!("🌐 Provider: {} ({} day window)", config.provider_base_url, config.history_days);
    match config.provider_timeout {
        Some(timeout) => println!("⏱️  Provider timeout: {}s", timeout.as_secs()),
        None => println!("⏱️  Provider timeout: none"),
    }

    if let Err(e) = server::serve(config).await {
        eprintln!("❌ Server error: {}", e);
        std::process::exit(1);
    }
}
