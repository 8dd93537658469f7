//! Download orchestrator: fetches several symbols in parallel through one
//! data manager, so every worker shares the same rate limiter and cache.

use super::manager::{DataManager, FetchOptions};
use super::provider::DataError;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Result for one symbol of a batch.
#[derive(Debug)]
pub enum SymbolOutcome {
    /// Fetched and passed validation.
    Valid { bars: usize },
    /// Fetched, but the series failed the validation gate.
    Invalid { bars: usize },
    /// The fetch itself failed.
    Failed(DataError),
}

impl SymbolOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, SymbolOutcome::Valid { .. })
    }
}

/// Callbacks for batch progress. Called from worker threads.
pub trait DownloadProgress: Send + Sync {
    /// Called when a worker picks up a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol completes.
    fn on_complete(&self, symbol: &str, done: usize, total: usize, outcome: &SymbolOutcome);

    /// Called once after every symbol has been attempted.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that does nothing.
pub struct SilentProgress;

impl DownloadProgress for SilentProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}
    fn on_complete(&self, _: &str, _: usize, _: usize, _: &SymbolOutcome) {}
    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}

/// Fetch every symbol over `[start, end]`.
///
/// Failures are collected per symbol; one bad symbol never aborts the batch.
/// Series that fail validation are reported separately from fetch errors.
pub fn download_symbols(
    manager: &DataManager,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    options: FetchOptions,
    progress: &dyn DownloadProgress,
) -> DownloadSummary {
    let total = symbols.len();
    let done = AtomicUsize::new(0);

    let results: Vec<(String, SymbolOutcome)> = symbols
        .par_iter()
        .enumerate()
        .map(|(i, symbol)| {
            progress.on_start(symbol, i, total);
            let outcome = match manager.get_daily_bars(symbol, start, end, options) {
                Ok(series) if manager.validate(&series) => SymbolOutcome::Valid {
                    bars: series.len(),
                },
                Ok(series) => SymbolOutcome::Invalid {
                    bars: series.len(),
                },
                Err(e) => SymbolOutcome::Failed(e),
            };
            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            progress.on_complete(symbol, finished, total, &outcome);
            (symbol.clone(), outcome)
        })
        .collect();

    let mut summary = DownloadSummary {
        total,
        succeeded: Vec::new(),
        invalid: Vec::new(),
        errors: Vec::new(),
    };
    for (symbol, outcome) in results {
        match outcome {
            SymbolOutcome::Valid { bars } => summary.succeeded.push((symbol, bars)),
            SymbolOutcome::Invalid { bars } => summary.invalid.push((symbol, bars)),
            SymbolOutcome::Failed(e) => summary.errors.push((symbol, e)),
        }
    }

    progress.on_batch_complete(summary.succeeded.len(), summary.failed(), total);
    summary
}

/// Summary of a batch download operation, in input order.
#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    /// Symbol and number of bars retrieved.
    pub succeeded: Vec<(String, usize)>,
    /// Symbols whose series was fetched but failed validation.
    pub invalid: Vec<(String, usize)>,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn failed(&self) -> usize {
        self.invalid.len() + self.errors.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}
