mod ohlcv;
mod price_bar;
pub mod server_config;

pub use ohlcv::DailyBar;
pub use price_bar::{coerce_volume, normalize_symbol, round_price, NewPriceBar, PriceBar};
pub use server_config::ServerConfig;
