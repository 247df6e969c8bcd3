//! MarketLens CLI — refresh, show, and cache management commands.
//!
//! Commands:
//! - `refresh` — run one sync cycle for an asset class and print the
//!   normalized cumulative-return index
//! - `show` — render the cached series through the view filter, no network
//! - `cache status` — report cached series, symbol sets, and date ranges

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use marketlens_core::{
    CsvStore, Dashboard, PriceProvider, StdoutProgress, SyntheticProvider, TimeSeriesTable,
    Universe, ViewFilter, YahooProvider,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "marketlens",
    about = "MarketLens CLI — cumulative-return dashboard pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the latest prices for an asset class and print the index.
    Refresh {
        /// Asset class from the universe (e.g. "Equity", "Bonds").
        #[arg(long, default_value = "Cross Asset")]
        class: String,

        /// Sync as of this date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        /// Universe TOML file. Defaults to the built-in cross-asset universe.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Use deterministic synthetic data instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Print only the last N rows of the index.
        #[arg(long, default_value_t = 10)]
        tail: usize,
    },
    /// Render the cached series through the view filter (no network).
    Show {
        /// Asset class from the universe.
        #[arg(long, default_value = "Cross Asset")]
        class: String,

        /// Symbols to display (defaults to the whole class).
        #[arg(long, num_args = 1..)]
        symbols: Vec<String>,

        /// Window start (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// Window end (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Universe TOML file.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Read the synthetic-data cache instead of the Yahoo one.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached series, their symbol sets and date ranges.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Refresh {
            class,
            as_of,
            universe,
            synthetic,
            cache_dir,
            tail,
        } => run_refresh(&class, as_of, universe, synthetic, cache_dir, tail),
        Commands::Show {
            class,
            symbols,
            start,
            end,
            universe,
            synthetic,
            cache_dir,
        } => run_show(&class, symbols, start, end, universe, synthetic, cache_dir),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
    }
}

fn load_universe(path: Option<PathBuf>) -> Result<Universe> {
    match path {
        Some(p) => Universe::from_file(&p).map_err(|e| anyhow::anyhow!(e)),
        None => Ok(Universe::default_cross_asset()),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?)
}

fn build_dashboard(
    universe: &Universe,
    class: &str,
    synthetic: bool,
    cache_dir: PathBuf,
) -> Result<Dashboard> {
    let Some(symbols) = universe.class_symbols(class) else {
        bail!(
            "unknown asset class '{class}'. Valid: {}",
            universe.class_names().join(", ")
        );
    };

    let provider: Box<dyn PriceProvider> = if synthetic {
        Box::new(SyntheticProvider::new())
    } else {
        Box::new(YahooProvider::new())
    };

    Ok(Dashboard::new(
        CsvStore::new(cache_dir),
        provider,
        symbols.to_vec(),
        universe.earliest,
    ))
}

fn run_refresh(
    class: &str,
    as_of: Option<String>,
    universe_path: Option<PathBuf>,
    synthetic: bool,
    cache_dir: PathBuf,
    tail: usize,
) -> Result<()> {
    let universe = load_universe(universe_path)?;
    let dashboard = build_dashboard(&universe, class, synthetic, cache_dir)?;

    let as_of = match as_of {
        Some(s) => parse_date(&s)?,
        None => chrono::Local::now().date_naive(),
    };

    let report = dashboard.refresh(as_of, &StdoutProgress)?;

    if !report.failed_symbols.is_empty() {
        for symbol in &report.failed_symbols {
            eprintln!(
                "WARNING: no data for {} ({})",
                symbol,
                universe.display_name(symbol)
            );
        }
    }

    if let Some(err) = &report.persist_error {
        eprintln!("WARNING: fetched data could not be persisted: {err}");
        eprintln!("Results below are from this session only.");
    }

    if report.is_empty() {
        println!("No valid data available for {class}.");
        return Ok(());
    }

    println!();
    println!("=== {class} — cumulative return index ===");
    print_table(&report.normalized, &universe, tail);
    Ok(())
}

fn run_show(
    class: &str,
    symbols: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    universe_path: Option<PathBuf>,
    synthetic: bool,
    cache_dir: PathBuf,
) -> Result<()> {
    let universe = load_universe(universe_path)?;
    let dashboard = build_dashboard(&universe, class, synthetic, cache_dir)?;

    let Some(normalized) = dashboard.load_cached() else {
        bail!("no cached data for {class} — run `marketlens refresh --class \"{class}\"` first");
    };

    let filter = ViewFilter {
        symbols: (!symbols.is_empty()).then_some(symbols),
        start: start.as_deref().map(parse_date).transpose()?,
        end: end.as_deref().map(parse_date).transpose()?,
    };
    let view = filter.apply(&normalized);

    if view.is_empty() {
        println!("No data available for the selected range or symbols.");
        return Ok(());
    }

    println!("=== {class} — cumulative return index ===");
    print_table(&view, &universe, usize::MAX);
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let store = CsvStore::new(cache_dir);
    let metas = store.status();

    if metas.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!();
    println!(
        "{:<18} {:<12} {:<25} {:>6}  Symbols",
        "Key", "Source", "Date Range", "Rows"
    );
    println!("{}", "-".repeat(80));
    for meta in &metas {
        let range = match (meta.start_date, meta.end_date) {
            (Some(s), Some(e)) => format!("{s} to {e}"),
            _ => "(empty)".to_string(),
        };
        println!(
            "{:<18} {:<12} {:<25} {:>6}  {}",
            meta.key,
            meta.source,
            range,
            meta.row_count,
            meta.symbols.join(" ")
        );
    }

    Ok(())
}

/// Print the trailing rows of a normalized table, one column per symbol.
fn print_table(table: &TimeSeriesTable, universe: &Universe, tail: usize) {
    let symbols = table.symbols();

    print!("{:<12}", "date");
    for symbol in symbols {
        print!(" {:>10}", symbol);
    }
    println!();

    let skip = table.len().saturating_sub(tail);
    for (date, row) in table.iter().skip(skip) {
        print!("{:<12}", date.format("%Y-%m-%d"));
        for cell in row {
            match cell {
                Some(v) => print!(" {:>10.4}", v),
                None => print!(" {:>10}", "-"),
            }
        }
        println!();
    }

    println!();
    for symbol in symbols {
        let name = universe.display_name(symbol);
        if name != symbol {
            println!("  {symbol}: {name}");
        }
    }
}
