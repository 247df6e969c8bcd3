//! Data boundary: providers and the durable cache store.

pub mod provider;
pub mod store;
pub mod synthetic;
pub mod yahoo;

pub use provider::{ClosePoint, FetchError, PriceProvider, SilentProgress, StdoutProgress, SyncProgress};
pub use store::{CacheKey, CsvStore, StoreError, StoreMeta};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
