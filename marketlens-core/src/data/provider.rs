//! Price provider trait and structured error types.
//!
//! The PriceProvider trait abstracts over remote data sources (Yahoo Finance,
//! synthetic walks) so the synchronizer can be tested against mocks. A
//! provider is called once per sync cycle with the whole symbol set; a
//! symbol it cannot serve (unknown, delisted, individually failed) is simply
//! omitted from the returned map rather than raised.

use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

/// A single dated closing-price observation for one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Provider-level errors.
///
/// These mean the provider as a whole could not serve the request. Per-symbol
/// failures are expressed by omission from the fetch result, not by error.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Trait for remote close-price sources.
///
/// One `fetch_closes` call covers the entire requested symbol set for the
/// cycle — the synchronizer never loops per symbol over the network boundary.
pub trait PriceProvider: Send + Sync {
    /// Short stable identifier, part of the cache key.
    fn name(&self) -> &str;

    /// Fetch daily closes for every requested symbol over `[start, end]`.
    ///
    /// The returned map contains an entry per symbol the provider could
    /// serve, each sorted by date ascending. Symbols with no data are absent.
    /// `Err` is reserved for total unavailability of the provider.
    fn fetch_closes(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<String, Vec<ClosePoint>>, FetchError>;
}

/// Progress callback for a sync cycle.
pub trait SyncProgress: Send {
    /// Called before the batched fetch, with the window being requested.
    fn on_fetch_start(&self, start: NaiveDate, end: NaiveDate, total_symbols: usize);

    /// Called per requested symbol once the fetch result is known.
    fn on_symbol(&self, symbol: &str, index: usize, total: usize, ok: bool);

    /// Called when the cycle's accounting is complete.
    fn on_complete(&self, valid: usize, failed: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl SyncProgress for StdoutProgress {
    fn on_fetch_start(&self, start: NaiveDate, end: NaiveDate, total_symbols: usize) {
        println!("Fetching {total_symbols} symbol(s), {start} to {end}...");
    }

    fn on_symbol(&self, symbol: &str, index: usize, total: usize, ok: bool) {
        if ok {
            println!("[{}/{}] OK: {symbol}", index + 1, total);
        } else {
            println!("[{}/{}] FAIL: {symbol}", index + 1, total);
        }
    }

    fn on_complete(&self, valid: usize, failed: usize, total: usize) {
        println!("\nSync complete: {valid}/{total} succeeded, {failed} failed");
    }
}

/// No-op progress reporter for non-interactive drivers.
pub struct SilentProgress;

impl SyncProgress for SilentProgress {
    fn on_fetch_start(&self, _start: NaiveDate, _end: NaiveDate, _total_symbols: usize) {}
    fn on_symbol(&self, _symbol: &str, _index: usize, _total: usize, _ok: bool) {}
    fn on_complete(&self, _valid: usize, _failed: usize, _total: usize) {}
}
