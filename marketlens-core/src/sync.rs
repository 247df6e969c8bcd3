//! Synchronizer — reconciles the cached series with the remote provider.
//!
//! One sync cycle issues at most one batched fetch. The fetch window is
//! incremental: with no prior series the full `[earliest, as_of]` history is
//! requested; with a prior series ending at `L < as_of` only `(L, as_of]` is
//! requested; with `L >= as_of` nothing is fetched at all, which makes
//! back-to-back refreshes idempotent and network-free.
//!
//! Every requested symbol lands in exactly one of `valid_symbols` or
//! `failed_symbols`, in request order. A failure for one symbol never aborts
//! the cycle for the others.

use crate::data::provider::{PriceProvider, SyncProgress};
use crate::table::TimeSeriesTable;
use chrono::NaiveDate;

/// Outcome of one sync cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResult {
    /// The merged, up-to-date series.
    pub series: TimeSeriesTable,
    /// Symbols the provider served this cycle (or that were already current),
    /// in request order.
    pub valid_symbols: Vec<String>,
    /// Symbols the provider omitted or that returned no bars, in request order.
    pub failed_symbols: Vec<String>,
}

impl SyncResult {
    fn empty() -> Self {
        Self {
            series: TimeSeriesTable::new(),
            valid_symbols: Vec::new(),
            failed_symbols: Vec::new(),
        }
    }
}

/// Run one fetch-and-merge cycle.
///
/// `existing` is the cached series (if any); the caller persists the returned
/// series afterward. When the provider as a whole is unreachable, every
/// requested symbol is reported failed and the existing series is returned
/// untouched — stale, but usable for the session.
pub fn sync(
    provider: &dyn PriceProvider,
    requested: &[String],
    existing: Option<TimeSeriesTable>,
    earliest: NaiveDate,
    as_of: NaiveDate,
    progress: &dyn SyncProgress,
) -> SyncResult {
    if requested.is_empty() {
        return SyncResult::empty();
    }

    let existing_last = existing.as_ref().and_then(|t| t.last_date());

    // Already up to date: no fetch, no mutation, everything valid.
    if let Some(last) = existing_last {
        if last >= as_of {
            let series = existing.unwrap_or_default();
            progress.on_complete(requested.len(), 0, requested.len());
            return SyncResult {
                series,
                valid_symbols: requested.to_vec(),
                failed_symbols: Vec::new(),
            };
        }
    }

    let start = match existing_last {
        Some(last) => last + chrono::Duration::days(1),
        None => earliest,
    };

    progress.on_fetch_start(start, as_of, requested.len());

    let mut series = existing.unwrap_or_default();
    let mut valid_symbols = Vec::new();
    let mut failed_symbols = Vec::new();

    match provider.fetch_closes(requested, start, as_of) {
        Ok(fetched) => {
            let total = requested.len();
            for (i, symbol) in requested.iter().enumerate() {
                match fetched.get(symbol).filter(|points| !points.is_empty()) {
                    Some(points) => {
                        // Append after existing rows; an overlapping boundary
                        // date takes the freshly fetched observation.
                        for point in points {
                            series.set(point.date, symbol, point.close);
                        }
                        progress.on_symbol(symbol, i, total, true);
                        valid_symbols.push(symbol.clone());
                    }
                    None => {
                        progress.on_symbol(symbol, i, total, false);
                        failed_symbols.push(symbol.clone());
                    }
                }
            }
        }
        Err(e) => {
            eprintln!("WARNING: provider '{}' unavailable: {e}", provider.name());
            failed_symbols = requested.to_vec();
        }
    }

    progress.on_complete(valid_symbols.len(), failed_symbols.len(), requested.len());

    SyncResult {
        series,
        valid_symbols,
        failed_symbols,
    }
}
