//! Synthetic close-price provider for offline and demo use.
//!
//! Produces a deterministic random walk per symbol, seeded from the symbol
//! name, so repeated runs and tests see identical data. Weekends are skipped
//! to mimic a trading calendar.

use super::provider::{ClosePoint, FetchError, PriceProvider};
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Deterministic random-walk provider.
pub struct SyntheticProvider;

impl SyntheticProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a deterministic close series for one symbol.
///
/// Simple random walk from 100.0, seeded by the symbol name.
pub fn generate_closes(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<ClosePoint> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut points = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        price *= 1.0 + daily_return;
        points.push(ClosePoint {
            date: current,
            close: price,
        });
        current += chrono::Duration::days(1);
    }

    points
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_closes(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<String, Vec<ClosePoint>>, FetchError> {
        Ok(symbols
            .iter()
            .map(|s| (s.clone(), generate_closes(s, start, end)))
            .collect())
    }
}
