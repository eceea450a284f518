//! Daily equity price cache.
//!
//! Fetches a trailing window of daily OHLCV bars from Yahoo Finance, replaces
//! the cached rows of that symbol in SQLite, and serves the cache over HTTP.

pub mod cli;
pub mod commands;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;
