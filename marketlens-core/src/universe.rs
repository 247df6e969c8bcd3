//! Universe configuration — asset classes, display names, earliest history.
//!
//! Stored as a TOML file mapping asset classes to their member symbols plus
//! a symbol → display-name table. Each asset class is one dashboard view
//! (and one cache key, since the symbol set differs).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The complete universe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    /// Earliest date history is ever requested from.
    pub earliest: NaiveDate,
    /// Asset class → member symbols, in display order.
    pub classes: BTreeMap<String, Vec<String>>,
    /// Symbol → human-readable display name.
    pub names: BTreeMap<String, String>,
}

impl Universe {
    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read universe file: {e}"))?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("parse universe TOML: {e}"))
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize universe: {e}"))
    }

    /// Symbols for an asset class.
    pub fn class_symbols(&self, class: &str) -> Option<&[String]> {
        self.classes.get(class).map(|v| v.as_slice())
    }

    /// Asset class names.
    pub fn class_names(&self) -> Vec<&str> {
        self.classes.keys().map(|s| s.as_str()).collect()
    }

    /// Display name for a symbol, falling back to the symbol itself.
    pub fn display_name<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.names.get(symbol).map(|s| s.as_str()).unwrap_or(symbol)
    }

    /// All symbols across every class, deduplicated, in class order.
    pub fn all_symbols(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for symbols in self.classes.values() {
            for s in symbols {
                if !seen.contains(&s.as_str()) {
                    seen.push(s.as_str());
                }
            }
        }
        seen
    }

    /// Default cross-asset universe.
    pub fn default_cross_asset() -> Self {
        let mut classes = BTreeMap::new();
        classes.insert(
            "Cross Asset".into(),
            to_strings(&["SPY", "IEF", "GLD", "USO", "UUP", "WEAT"]),
        );
        classes.insert("Equity".into(), to_strings(&["SPY", "QQQ", "IWM"]));
        classes.insert("Bonds".into(), to_strings(&["IEF", "TLT", "SHY"]));
        classes.insert("Forex".into(), to_strings(&["UUP", "FXE", "FXY"]));
        classes.insert("Rates".into(), to_strings(&["^IRX", "^TNX", "^TYX"]));

        let names = [
            ("SPY", "S&P 500 ETF"),
            ("QQQ", "Nasdaq 100 ETF"),
            ("IWM", "Russell 2000 ETF"),
            ("IEF", "10-Year Treasury ETF"),
            ("TLT", "20+ Year Treasury ETF"),
            ("SHY", "1-3 Year Treasury ETF"),
            ("GLD", "Gold ETF"),
            ("USO", "Crude Oil ETF"),
            ("UUP", "US Dollar Index ETF"),
            ("WEAT", "Wheat ETF"),
            ("FXE", "Euro ETF"),
            ("FXY", "Yen ETF"),
            ("^IRX", "3M Treasury Yield"),
            ("^TNX", "10Y Treasury Yield"),
            ("^TYX", "30Y Treasury Yield"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            earliest: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
            classes,
            names,
        }
    }
}

fn to_strings(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}
