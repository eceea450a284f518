use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;
use crate::models::ServerConfig;

#[derive(Parser)]
#[command(name = "miniquant")]
#[command(about = "Daily stock price cache backed by Yahoo Finance", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// SQLite database file (overrides DATABASE_PATH)
    #[arg(short, long)]
    pub database: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Listen port (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Refresh the cached window of one symbol from Yahoo Finance
    Fetch {
        /// Ticker symbol, e.g. AAPL
        symbol: String,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Print the cached bars of one symbol
    Show {
        /// Ticker symbol, e.g. AAPL
        symbol: String,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Show database statistics
    Status {
        #[command(flatten)]
        store: StoreArgs,
    },
}

pub async fn run() {
    let cli = Cli::parse();

    let mut config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Serve { port, store } => {
            apply_store_args(&mut config, store);
            if let Some(port) = port {
                config.port = port;
            }
            commands::serve::run(config).await;
        }
        Commands::Fetch { symbol, store } => {
            apply_store_args(&mut config, store);
            commands::fetch::run(config, symbol).await;
        }
        Commands::Show { symbol, store } => {
            apply_store_args(&mut config, store);
            commands::show::run(config, symbol).await;
        }
        Commands::Status { store } => {
            apply_store_args(&mut config, store);
            commands::status::run(config).await;
        }
    }
}

fn apply_store_args(config: &mut ServerConfig, args: StoreArgs) {
    if let Some(path) = args.database {
        config.database_path = path;
    }
}
