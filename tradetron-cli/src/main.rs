//! Tradetron CLI — ticker lookup, daily bars, feature processing and cache
//! management.
//!
//! Commands:
//! - `ticker` — print reference metadata for a symbol
//! - `bars` — fetch daily bars (cache-first) and print the validation verdict
//! - `process` — fetch, validate and enrich with indicators; optional CSV/Parquet export
//! - `download` — fetch several symbols in parallel through one rate limiter
//! - `cache status` — list cached entries with age and staleness
//! - `cache clean` — remove stale and corrupt cache entries

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, TimeDelta};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tradetron_core::data::{
    download_symbols, DataManager, DownloadProgress, FetchOptions, JsonFileCache, MemoryCache,
    PolygonClient, SymbolOutcome, SyntheticProvider,
};
use tradetron_core::domain::BarSeries;
use tradetron_core::features::{process, ProcessOptions};
use tradetron_core::indicators::IndicatorSpec;
use tradetron_core::DataConfig;

#[derive(Parser)]
#[command(
    name = "tradetron",
    about = "Tradetron CLI — daily bars, caching and indicator features"
)]
struct Cli {
    /// TOML config file ([polygon] and [cache] sections).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the offline synthetic provider (no API key, in-memory cache).
    #[arg(long, global = true, default_value_t = false)]
    synthetic: bool,

    /// Log filter, e.g. `debug` or `tradetron_core=trace`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Inclusive date range. Defaults to the last 365 days ending today.
#[derive(Args, Clone)]
struct RangeArgs {
    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD).
    #[arg(long)]
    end: Option<String>,
}

impl RangeArgs {
    fn resolve(&self) -> Result<(NaiveDate, NaiveDate)> {
        let end = parse_date(self.end.as_deref())?.unwrap_or_else(|| Local::now().date_naive());
        let start = parse_date(self.start.as_deref())?.unwrap_or(end - TimeDelta::days(365));
        if start > end {
            bail!("start date {start} is after end date {end}");
        }
        Ok((start, end))
    }
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
    })
    .transpose()
}

#[derive(Args, Clone, Copy)]
struct FetchArgs {
    /// Skip the cache for both lookup and store.
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Request unadjusted prices (never cached).
    #[arg(long, default_value_t = false)]
    unadjusted: bool,
}

impl FetchArgs {
    fn options(self) -> FetchOptions {
        FetchOptions {
            use_cache: !self.no_cache,
            adjusted: !self.unadjusted,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print ticker reference metadata.
    Ticker { symbol: String },
    /// Fetch daily bars and print the validation verdict and the last rows.
    Bars {
        symbol: String,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        fetch: FetchArgs,

        /// Number of trailing rows to print.
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
    /// Fetch, validate and enrich with indicators and price features.
    Process {
        symbol: String,

        #[command(flatten)]
        range: RangeArgs,

        /// Indicator selection, e.g. `sma:window=50;rsi;macd:window_fast=8`.
        #[arg(long, conflicts_with = "no_indicators")]
        indicators: Option<String>,

        /// Skip technical indicators.
        #[arg(long, default_value_t = false)]
        no_indicators: bool,

        /// Skip derived price features.
        #[arg(long, default_value_t = false)]
        no_features: bool,

        /// Write the enriched series to FILE.csv or FILE.parquet.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Fetch several symbols in parallel through one shared rate limiter.
    Download {
        #[arg(required = true)]
        symbols: Vec<String>,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        fetch: FetchArgs,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached entries with bar counts, age and staleness.
    Status,
    /// Remove stale and corrupt entries.
    Clean {
        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match &cli.command {
        Commands::Ticker { symbol } => run_ticker(&cli, symbol),
        Commands::Bars {
            symbol,
            range,
            fetch,
            rows,
        } => run_bars(&cli, symbol, range, *fetch, *rows),
        Commands::Process {
            symbol,
            range,
            indicators,
            no_indicators,
            no_features,
            out,
        } => {
            let options = process_options(indicators.as_deref(), *no_indicators, *no_features)?;
            run_process(&cli, symbol, range, &options, out.as_deref())
        }
        Commands::Download {
            symbols,
            range,
            fetch,
        } => run_download(&cli, symbols, range, *fetch),
        Commands::Cache { action } => {
            let cache = file_cache(&load_config(&cli)?);
            match action {
                CacheAction::Status => run_cache_status(&cache),
                CacheAction::Clean { confirm } => run_cache_clean(&cache, *confirm),
            }
        }
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ── Wiring ───────────────────────────────────────────────────────────

fn load_config(cli: &Cli) -> Result<DataConfig> {
    DataConfig::load(cli.config.as_deref()).context("failed to load configuration")
}

fn file_cache(config: &DataConfig) -> JsonFileCache {
    JsonFileCache::new(config.cache_dir()).with_ttl(config.cache_ttl())
}

/// Synthetic mode pairs the offline provider with an in-memory cache so
/// generated bars never land in the on-disk cache.
fn build_manager(cli: &Cli) -> Result<DataManager> {
    if cli.synthetic {
        info!("using synthetic provider");
        return Ok(DataManager::new(
            Arc::new(SyntheticProvider::default()),
            Arc::new(MemoryCache::new()),
        ));
    }

    let config = load_config(cli)?;
    let client = PolygonClient::new(&config).context("failed to create Polygon client")?;
    info!(
        base_url = config.base_url(),
        calls_per_minute = config.calls_per_minute(),
        cache_dir = %config.cache_dir().display(),
        "using polygon provider"
    );
    Ok(DataManager::new(Arc::new(client), Arc::new(file_cache(&config))))
}

fn process_options(
    indicators: Option<&str>,
    no_indicators: bool,
    no_features: bool,
) -> Result<ProcessOptions> {
    let mut options = ProcessOptions::default();
    if let Some(raw) = indicators {
        let spec: IndicatorSpec = raw
            .parse()
            .with_context(|| format!("invalid --indicators '{raw}'"))?;
        options = options.with_indicators(spec);
    }
    if no_indicators {
        options = options.without_indicators();
    }
    if no_features {
        options = options.without_features();
    }
    Ok(options)
}

// ── Commands ─────────────────────────────────────────────────────────

fn run_ticker(cli: &Cli, symbol: &str) -> Result<()> {
    let manager = build_manager(cli)?;
    let ticker = manager.get_ticker_info(symbol)?;

    println!("Symbol:    {}", ticker.symbol);
    println!("Name:      {}", ticker.name);
    println!("Market:    {} ({})", ticker.market, ticker.locale);
    println!("Exchange:  {}", ticker.primary_exchange);
    println!("Type:      {}", ticker.security_type);
    println!("Currency:  {}", ticker.currency);
    println!("Active:    {}", ticker.active);
    if let Some(cik) = &ticker.cik {
        println!("CIK:       {cik}");
    }
    if let Some(figi) = &ticker.composite_figi {
        println!("FIGI:      {figi}");
    }
    Ok(())
}

fn run_bars(
    cli: &Cli,
    symbol: &str,
    range: &RangeArgs,
    fetch: FetchArgs,
    rows: usize,
) -> Result<()> {
    let (start, end) = range.resolve()?;
    let manager = build_manager(cli)?;
    let series = manager.get_daily_bars(symbol, start, end, fetch.options())?;

    println!("{symbol}: {} bars from {start} to {end}", series.len());
    println!("Valid: {}", manager.validate(&series));
    print_tail(&series, rows);
    Ok(())
}

fn run_process(
    cli: &Cli,
    symbol: &str,
    range: &RangeArgs,
    options: &ProcessOptions,
    out: Option<&Path>,
) -> Result<()> {
    let (start, end) = range.resolve()?;
    let manager = build_manager(cli)?;
    let series = manager.get_daily_data(symbol, start, end, true)?;

    if !manager.validate(&series) {
        bail!("{symbol}: {} bars failed validation, not processing", series.len());
    }

    let enriched = process(&series, options)
        .with_context(|| format!("failed to process {symbol}"))?;

    println!(
        "{symbol}: {} input rows, {} retained, {} dropped during warm-up",
        series.len(),
        enriched.len(),
        enriched.dropped_rows()
    );
    let timestamps = enriched.timestamps();
    if let (Some(first), Some(last)) = (timestamps.first(), timestamps.last()) {
        println!("Range:   {} to {}", first.date_naive(), last.date_naive());
    }
    let last_row = enriched.len().checked_sub(1);
    for name in enriched.names() {
        match last_row.and_then(|row| enriched.value(name, row)) {
            Some(value) => println!("  {name:<18} {value:>14.4}"),
            None => println!("  {name:<18} {:>14}", "-"),
        }
    }

    if let Some(path) = out {
        let written = match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => enriched.write_csv(path),
            Some("parquet") => enriched.write_parquet(path),
            _ => bail!("unsupported output format for {}: use .csv or .parquet", path.display()),
        };
        written.with_context(|| format!("failed to write {}", path.display()))?;
        println!("Saved to: {}", path.display());
    }
    Ok(())
}

fn run_download(cli: &Cli, symbols: &[String], range: &RangeArgs, fetch: FetchArgs) -> Result<()> {
    let (start, end) = range.resolve()?;
    let manager = build_manager(cli)?;
    let progress = StdoutProgress::default();

    let summary = download_symbols(&manager, symbols, start, end, fetch.options(), &progress);

    if !summary.all_succeeded() {
        for (sym, bars) in &summary.invalid {
            eprintln!("Invalid data for {sym}: {bars} bars failed validation");
        }
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        bail!("{} of {} symbol(s) failed", summary.failed(), summary.total);
    }
    Ok(())
}

fn run_cache_status(cache: &JsonFileCache) -> Result<()> {
    let entries = cache.entries();
    if entries.is_empty() {
        println!("Cache is empty: {}", cache.cache_dir().display());
        return Ok(());
    }

    let now = chrono::Utc::now();
    println!("Cache: {}", cache.cache_dir().display());
    println!("Entries: {} (TTL {}h)", entries.len(), cache.ttl().num_hours());
    println!();
    println!(
        "{:<8} {:<25} {:>6} {:>10}  {}",
        "Symbol", "Date Range", "Bars", "Age", "State"
    );
    println!("{}", "-".repeat(60));
    for entry in &entries {
        let symbol = entry.symbol.as_deref().unwrap_or("?");
        let range = match (entry.start, entry.end) {
            (Some(s), Some(e)) => format!("{s} to {e}"),
            _ => "(unknown)".to_string(),
        };
        let age = entry
            .cached_at
            .map(|t| format_age(now - t))
            .unwrap_or_else(|| "-".to_string());
        let state = if entry.corrupt {
            "corrupt"
        } else if entry.stale {
            "stale"
        } else {
            "fresh"
        };
        println!(
            "{:<8} {:<25} {:>6} {:>10}  {}",
            symbol, range, entry.bar_count, age, state
        );
    }
    Ok(())
}

fn run_cache_clean(cache: &JsonFileCache, confirm: bool) -> Result<()> {
    let doomed: Vec<_> = cache
        .entries()
        .into_iter()
        .filter(|e| e.stale || e.corrupt)
        .collect();

    if doomed.is_empty() {
        println!("No stale entries to remove.");
        return Ok(());
    }

    println!("Found {} stale or corrupt entr(ies):", doomed.len());
    for entry in &doomed {
        println!("  {}", entry.path.display());
    }

    if !confirm {
        println!();
        println!("Dry run — pass --confirm to actually delete.");
        return Ok(());
    }

    let removed = cache
        .purge_stale()
        .context("failed to purge stale cache entries")?;
    println!("Done. Removed {removed} entr(ies).");
    Ok(())
}

// ── Output helpers ───────────────────────────────────────────────────

fn print_tail(series: &BarSeries, rows: usize) {
    let bars = series.bars();
    if bars.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10} {:>14}",
        "Date", "Open", "High", "Low", "Close", "Volume"
    );
    for bar in &bars[bars.len().saturating_sub(rows)..] {
        println!(
            "{:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>14.0}",
            bar.date(),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        );
    }
}

fn format_age(age: TimeDelta) -> String {
    if age.num_days() > 0 {
        format!("{}d", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{}h", age.num_hours())
    } else {
        format!("{}m", age.num_minutes().max(0))
    }
}

/// Prints one line per symbol as workers finish.
#[derive(Default)]
struct StdoutProgress {
    started: AtomicUsize,
}

impl DownloadProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, _index: usize, total: usize) {
        if self.started.fetch_add(1, Ordering::Relaxed) == 0 {
            println!("Downloading {total} symbol(s)...");
        }
        tracing::debug!(symbol, "download started");
    }

    fn on_complete(&self, symbol: &str, done: usize, total: usize, outcome: &SymbolOutcome) {
        match outcome {
            SymbolOutcome::Valid { bars } => println!("[{done}/{total}] {symbol}: {bars} bars"),
            SymbolOutcome::Invalid { bars } => {
                println!("[{done}/{total}] {symbol}: {bars} bars FAILED validation")
            }
            SymbolOutcome::Failed(e) => println!("[{done}/{total}] {symbol}: FAILED ({e})"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!();
        println!("Done: {succeeded}/{total} succeeded, {failed} failed.");
    }
}
