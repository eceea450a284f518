pub mod price_store;
pub mod price_sync;
pub mod provider;
pub mod yahoo;

pub use price_store::{PriceStore, StoreStats};
pub use price_sync::{PriceSync, SyncReport};
pub use provider::PriceProvider;
pub use yahoo::YahooClient;
