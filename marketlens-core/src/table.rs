//! Wide time-series table: one row per trading date, one column per symbol.
//!
//! The table is the single shape that flows through the whole pipeline:
//! sync output, cache contents, preprocessed series, and normalized series
//! are all `TimeSeriesTable`s. Rows live in a `BTreeMap`, so dates are
//! strictly increasing and duplicate-free by construction. A missing
//! observation is `None` — never 0.0, never NaN.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Date-ordered table of optional closing prices, keyed by (date, symbol).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesTable {
    /// Symbol columns in stable insertion order.
    symbols: Vec<String>,
    /// One row per date; each row has exactly `symbols.len()` slots.
    rows: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

impl TimeSeriesTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with a fixed column order.
    pub fn with_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            rows: BTreeMap::new(),
        }
    }

    /// Symbol columns in stable order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of date rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next_back().copied()
    }

    /// Column index for a symbol, if present.
    pub fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// Column index for a symbol, adding the column (and padding every
    /// existing row with a missing slot) if it is new.
    pub fn ensure_symbol(&mut self, symbol: &str) -> usize {
        if let Some(idx) = self.symbol_index(symbol) {
            return idx;
        }
        self.symbols.push(symbol.to_string());
        for row in self.rows.values_mut() {
            row.push(None);
        }
        self.symbols.len() - 1
    }

    /// Set the observation for (date, symbol), overwriting any prior value.
    pub fn set(&mut self, date: NaiveDate, symbol: &str, value: f64) {
        let idx = self.ensure_symbol(symbol);
        let width = self.symbols.len();
        let row = self.rows.entry(date).or_insert_with(|| vec![None; width]);
        row[idx] = Some(value);
    }

    /// Ensure a row exists for `date`, with every cell missing if it is new.
    ///
    /// Lets a loaded file round-trip dates that carried no observations;
    /// such rows are eliminated later by preprocessing.
    pub fn touch(&mut self, date: NaiveDate) {
        let width = self.symbols.len();
        self.rows.entry(date).or_insert_with(|| vec![None; width]);
    }

    /// Observation for (date, symbol), `None` when the row, column, or cell
    /// is missing.
    pub fn get(&self, date: NaiveDate, symbol: &str) -> Option<f64> {
        let idx = self.symbol_index(symbol)?;
        self.rows.get(&date).and_then(|row| row[idx])
    }

    /// Row cells for a date, in column order.
    pub fn row(&self, date: NaiveDate) -> Option<&[Option<f64>]> {
        self.rows.get(&date).map(|r| r.as_slice())
    }

    /// Dates in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    /// Rows in ascending date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[Option<f64>])> {
        self.rows.iter().map(|(d, r)| (*d, r.as_slice()))
    }

    /// Merge another table into this one, row-level last-write-wins: every
    /// non-missing cell of `newer` overwrites the cell at the same
    /// (date, symbol) here. Missing cells in `newer` never erase existing
    /// observations, so a symbol that failed a fetch keeps its history.
    pub fn merge(&mut self, newer: &TimeSeriesTable) {
        for (date, row) in newer.iter() {
            for (idx, cell) in row.iter().enumerate() {
                if let Some(value) = cell {
                    self.set(date, &newer.symbols[idx], *value);
                }
            }
        }
    }
}
