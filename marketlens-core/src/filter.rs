//! View filter — symbol subset and date window applied before rendering.
//!
//! The filter only intersects with what the table actually has: unknown
//! symbols and out-of-range bounds narrow the result rather than erroring.
//! An empty result is the caller-facing "no data in window" state.

use crate::table::TimeSeriesTable;
use chrono::NaiveDate;

/// User-chosen view over a normalized series.
#[derive(Debug, Clone, Default)]
pub struct ViewFilter {
    /// Symbols to keep, in the given order. `None` keeps every column.
    pub symbols: Option<Vec<String>>,
    /// Inclusive start of the date window.
    pub start: Option<NaiveDate>,
    /// Inclusive end of the date window.
    pub end: Option<NaiveDate>,
}

impl ViewFilter {
    /// Apply the filter, producing a fresh table.
    pub fn apply(&self, table: &TimeSeriesTable) -> TimeSeriesTable {
        let selected: Vec<String> = match &self.symbols {
            Some(wanted) => wanted
                .iter()
                .filter(|s| table.symbol_index(s).is_some())
                .cloned()
                .collect(),
            None => table.symbols().to_vec(),
        };

        let mut out = TimeSeriesTable::with_symbols(selected.clone());

        for (date, _) in table.iter() {
            if self.start.is_some_and(|s| date < s) {
                continue;
            }
            if self.end.is_some_and(|e| date > e) {
                continue;
            }
            for symbol in &selected {
                if let Some(value) = table.get(date, symbol) {
                    out.set(date, symbol, value);
                }
            }
        }

        out
    }
}
