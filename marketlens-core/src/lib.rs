//! MarketLens Core — incremental price sync and cumulative-return pipeline.
//!
//! This crate contains the data pipeline behind the dashboard:
//! - `TimeSeriesTable`: date-ordered wide table with explicit missing cells
//! - Price providers (Yahoo Finance, deterministic synthetic) behind a trait
//! - A flat CSV cache store keyed by (symbol set, source), atomic writes
//! - The synchronizer: incremental fetch windows, per-symbol accounting,
//!   last-write-wins merge
//! - Forward-fill preprocessing and cumulative-return normalization
//! - The view filter and the `Dashboard::refresh` entry point
//!
//! Rendering, widget chrome, and charting live outside this crate; it only
//! hands a normalized series plus valid/failed symbol lists to whatever
//! driver asked for the refresh.

pub mod data;
pub mod filter;
pub mod pipeline;
pub mod sync;
pub mod table;
pub mod transform;
pub mod universe;

pub use data::{
    CacheKey, ClosePoint, CsvStore, FetchError, PriceProvider, SilentProgress, StdoutProgress,
    StoreError, StoreMeta, SyncProgress, SyntheticProvider, YahooProvider,
};
pub use filter::ViewFilter;
pub use pipeline::{Dashboard, RefreshError, RefreshReport};
pub use sync::{sync, SyncResult};
pub use table::TimeSeriesTable;
pub use transform::{normalize, preprocess};
pub use universe::Universe;
