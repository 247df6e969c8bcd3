//! Yahoo Finance close-price provider.
//!
//! Fetches daily closes from Yahoo's v8 chart API, one request per symbol
//! inside the batched `fetch_closes` call. A symbol that is unknown or whose
//! request fails is dropped from the result (omission, not error); only a
//! provider that looks wholly unreachable — every symbol failing at the
//! network level — surfaces as a `FetchError`. There is no automatic retry.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes.

use super::provider::{ClosePoint, FetchError, PriceProvider};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
}

impl YahooProvider {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }

    /// Build the chart API URL for a symbol and date range.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let end_ts = end.and_hms_opt(23, 59, 59).unwrap().and_utc().timestamp();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }

    /// Parse the chart API response into close points.
    fn parse_response(resp: ChartResponse) -> Option<Vec<ClosePoint>> {
        let data = resp.chart.result?.into_iter().next()?;
        let timestamps = data.timestamp?;
        let quote = data.indicators.quote.into_iter().next()?;

        let mut points = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)?.naive_utc().date();
            // Holidays and halted sessions come back as null closes; skip them
            // so missing stays missing instead of turning into NaN.
            if let Some(close) = quote.close.get(i).copied().flatten() {
                points.push(ClosePoint { date, close });
            }
        }

        if points.is_empty() {
            return None;
        }
        Some(points)
    }

    /// One attempt for one symbol. `Ok(None)` means the symbol is unusable
    /// (not found, empty, malformed); `Err` means the network itself failed.
    fn fetch_symbol(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Vec<ClosePoint>>, FetchError> {
        let url = Self::chart_url(symbol, start, end);

        let resp = self.client.get(&url).send().map_err(|e| {
            FetchError::NetworkUnreachable(e.to_string())
        })?;

        if !resp.status().is_success() {
            return Ok(None);
        }

        match resp.json::<ChartResponse>() {
            Ok(chart) => Ok(Self::parse_response(chart)),
            Err(_) => Ok(None),
        }
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_closes(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<String, Vec<ClosePoint>>, FetchError> {
        let mut result = HashMap::new();
        let mut last_network_error = None;
        let mut network_failures = 0usize;

        for symbol in symbols {
            match self.fetch_symbol(symbol, start, end) {
                Ok(Some(points)) => {
                    result.insert(symbol.clone(), points);
                }
                Ok(None) => {}
                Err(e) => {
                    network_failures += 1;
                    last_network_error = Some(e);
                }
            }
        }

        // Every request died at the network level: the provider is down,
        // not individual symbols.
        if !symbols.is_empty() && network_failures == symbols.len() {
            return Err(last_network_error
                .unwrap_or_else(|| FetchError::Unavailable("no requests issued".into())));
        }

        Ok(result)
    }
}
