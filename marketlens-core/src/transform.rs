//! Pure transforms over the synced series: forward-fill preprocessing and
//! cumulative-return normalization.
//!
//! Both functions build a fresh table and never touch their input. The
//! normalizer deliberately keeps missing cells missing: a genuinely absent
//! price is not a zero return, and zero-filling it would silently flatten
//! the index.

use crate::table::TimeSeriesTable;

/// Forward-fill gaps, then drop rows where every symbol is still missing.
///
/// A missing cell takes the most recent prior value of the same symbol; a
/// symbol with no prior observation stays missing (no look-ahead). A row
/// survives as long as at least one symbol has a resolved value by that
/// date. Date order and the symbol set are preserved.
pub fn preprocess(table: &TimeSeriesTable) -> TimeSeriesTable {
    let symbols = table.symbols().to_vec();
    let mut out = TimeSeriesTable::with_symbols(symbols.clone());

    let mut last_seen: Vec<Option<f64>> = vec![None; symbols.len()];

    for (date, row) in table.iter() {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(value) = cell {
                last_seen[idx] = Some(*value);
            }
        }
        if last_seen.iter().all(Option::is_none) {
            continue; // no symbol has produced a value yet
        }
        for (idx, filled) in last_seen.iter().enumerate() {
            if let Some(value) = filled {
                out.set(date, &symbols[idx], *value);
            }
        }
    }

    out
}

/// Convert price levels into a cumulative-return index anchored at 1.0.
///
/// Per symbol, the first non-missing observation maps to exactly 1.0 and
/// each subsequent non-missing price `p_t` maps to
/// `idx_prev * (p_t / p_prev)` over consecutive non-missing observations.
/// Missing cells propagate as missing.
pub fn normalize(table: &TimeSeriesTable) -> TimeSeriesTable {
    let symbols = table.symbols().to_vec();
    let mut out = TimeSeriesTable::with_symbols(symbols.clone());

    // Per symbol: last non-missing price and the index value it mapped to.
    let mut state: Vec<Option<(f64, f64)>> = vec![None; symbols.len()];

    for (date, row) in table.iter() {
        for (idx, cell) in row.iter().enumerate() {
            let Some(price) = cell else {
                continue;
            };
            let index = match state[idx] {
                None => 1.0,
                Some((prev_price, prev_index)) => prev_index * (price / prev_price),
            };
            state[idx] = Some((*price, index));
            out.set(date, &symbols[idx], index);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dates() -> [NaiveDate; 4] {
        [
            d("2024-01-02"),
            d("2024-01-03"),
            d("2024-01-04"),
            d("2024-01-05"),
        ]
    }

    #[test]
    fn forward_fill_bridges_interior_gaps() {
        let [d1, d2, d3, d4] = dates();
        let mut t = TimeSeriesTable::with_symbols(["SPY", "QQQ"]);
        t.set(d1, "SPY", 1.0);
        t.set(d4, "SPY", 2.0);
        // QQQ present on every date so no row is dropped.
        for (i, date) in [d1, d2, d3, d4].into_iter().enumerate() {
            t.set(date, "QQQ", 10.0 + i as f64);
        }

        let p = preprocess(&t);

        assert_eq!(p.get(d1, "SPY"), Some(1.0));
        assert_eq!(p.get(d2, "SPY"), Some(1.0));
        assert_eq!(p.get(d3, "SPY"), Some(1.0));
        assert_eq!(p.get(d4, "SPY"), Some(2.0));
    }

    #[test]
    fn leading_gap_stays_missing() {
        let [d1, d2, ..] = dates();
        let mut t = TimeSeriesTable::with_symbols(["SPY", "QQQ"]);
        t.set(d1, "QQQ", 10.0);
        t.set(d2, "SPY", 1.0);
        t.set(d2, "QQQ", 11.0);

        let p = preprocess(&t);

        // SPY has no prior value on d1: not filled.
        assert_eq!(p.get(d1, "SPY"), None);
        assert_eq!(p.get(d2, "SPY"), Some(1.0));
    }

    #[test]
    fn all_missing_rows_are_eliminated() {
        let [d1, d2, d3, _] = dates();
        let mut t = TimeSeriesTable::with_symbols(["SPY", "QQQ"]);
        t.touch(d1); // a date with no observations at all
        t.set(d2, "SPY", 1.0);
        t.set(d3, "QQQ", 10.0);

        let p = preprocess(&t);

        // d1 precedes every symbol's first value: dropped.
        assert_eq!(p.dates().collect::<Vec<_>>(), vec![d2, d3]);
        // d3 survives with SPY forward-filled next to QQQ's first value.
        assert_eq!(p.get(d3, "SPY"), Some(1.0));
        assert_eq!(p.get(d3, "QQQ"), Some(10.0));
    }

    #[test]
    fn partially_resolved_rows_survive() {
        let [d1, d2, ..] = dates();
        let mut t = TimeSeriesTable::with_symbols(["SPY", "QQQ"]);
        t.set(d1, "SPY", 1.0);
        t.touch(d2); // no new observations, but SPY fills forward

        let p = preprocess(&t);

        assert_eq!(p.len(), 2);
        assert_eq!(p.get(d2, "SPY"), Some(1.0));
        assert_eq!(p.get(d2, "QQQ"), None);
    }

    #[test]
    fn preprocess_never_invents_dates_or_symbols() {
        let [d1, _, d3, _] = dates();
        let mut t = TimeSeriesTable::with_symbols(["SPY"]);
        t.set(d1, "SPY", 1.0);
        t.set(d3, "SPY", 2.0);

        let p = preprocess(&t);

        // No row was fabricated for the calendar gap between d1 and d3.
        assert_eq!(p.dates().collect::<Vec<_>>(), vec![d1, d3]);
        assert_eq!(p.symbols(), t.symbols());
    }

    #[test]
    fn preprocess_does_not_mutate_input() {
        let [d1, _, _, d4] = dates();
        let mut t = TimeSeriesTable::with_symbols(["SPY"]);
        t.set(d1, "SPY", 1.0);
        t.set(d4, "SPY", 2.0);
        let before = t.clone();

        let _ = preprocess(&t);
        assert_eq!(t, before);
    }

    #[test]
    fn normalized_index_is_anchored_at_one() {
        let [d1, d2, d3, _] = dates();
        let mut t = TimeSeriesTable::with_symbols(["SPY", "QQQ"]);
        t.set(d1, "SPY", 412.0);
        t.set(d1, "QQQ", 99.5);
        t.set(d2, "SPY", 415.0);
        t.set(d2, "QQQ", 101.0);
        t.set(d3, "SPY", 410.0);

        let n = normalize(&t);

        assert_eq!(n.get(d1, "SPY"), Some(1.0));
        assert_eq!(n.get(d1, "QQQ"), Some(1.0));
    }

    #[test]
    fn normalized_index_tracks_compounded_returns() {
        let [d1, d2, d3, _] = dates();
        let mut t = TimeSeriesTable::with_symbols(["SPY"]);
        t.set(d1, "SPY", 100.0);
        t.set(d2, "SPY", 110.0);
        t.set(d3, "SPY", 99.0);

        let n = normalize(&t);

        assert!((n.get(d1, "SPY").unwrap() - 1.0).abs() < 1e-12);
        assert!((n.get(d2, "SPY").unwrap() - 1.1).abs() < 1e-12);
        assert!((n.get(d3, "SPY").unwrap() - 0.99).abs() < 1e-12);
    }

    #[test]
    fn missing_cells_stay_missing_after_normalize() {
        let [d1, d2, d3, _] = dates();
        let mut t = TimeSeriesTable::with_symbols(["SPY", "QQQ"]);
        t.set(d1, "SPY", 100.0);
        t.set(d2, "SPY", 110.0);
        t.set(d3, "SPY", 121.0);
        // QQQ only trades from d2 (leading gap survived preprocessing).
        t.set(d2, "QQQ", 50.0);
        t.set(d3, "QQQ", 55.0);

        let n = normalize(&t);

        // Not zero, not filled: just absent.
        assert_eq!(n.get(d1, "QQQ"), None);
        // QQQ's anchor is its own first observation.
        assert_eq!(n.get(d2, "QQQ"), Some(1.0));
        assert!((n.get(d3, "QQQ").unwrap() - 1.1).abs() < 1e-12);
    }

    #[test]
    fn returns_compound_across_an_interior_gap() {
        let [d1, d2, d3, _] = dates();
        let mut t = TimeSeriesTable::with_symbols(["SPY", "QQQ"]);
        t.set(d1, "SPY", 100.0);
        t.set(d3, "SPY", 120.0); // d2 missing for SPY
        t.set(d2, "QQQ", 10.0);

        let n = normalize(&t);

        assert_eq!(n.get(d2, "SPY"), None);
        // Return computed over consecutive non-missing observations.
        assert!((n.get(d3, "SPY").unwrap() - 1.2).abs() < 1e-12);
    }

    #[test]
    fn normalize_does_not_mutate_input() {
        let [d1, d2, ..] = dates();
        let mut t = TimeSeriesTable::with_symbols(["SPY"]);
        t.set(d1, "SPY", 100.0);
        t.set(d2, "SPY", 110.0);
        let before = t.clone();

        let _ = normalize(&t);
        assert_eq!(t, before);
    }
}
