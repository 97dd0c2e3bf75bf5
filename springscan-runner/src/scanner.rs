//! Scan orchestration: fetch, score, pace, rank, truncate.
//!
//! Two modes share the same per-symbol step and the same finalization:
//! - `workers == 1`: symbols in input order, fixed pause after each one.
//! - `workers > 1`: a Rayon pool of that many threads, every provider call
//!   (retries included) gated by a shared token bucket at the sequential
//!   schedule's average rate. Results are collected in input order, so
//!   ranking and ties match sequential mode.
//!
//! Nothing in a scan is fatal. Every input symbol ends up in exactly one
//! bucket of the returned `ScanOutcome`.

use crate::config::{ConfigError, FetchPolicy, PacingConfig, ScanConfig};
use crate::fetcher::{FetchFailure, HistoryFetcher};
use crate::outcome::{DiscardReason, Discarded, ScanOutcome, ScanResult};
use crate::pacing::{PauseSchedule, RateLimit};
use crate::progress::{NoProgress, ScanProgress, SymbolStatus};
use rayon::prelude::*;
use springscan_core::data::{DataError, DataProvider};
use springscan_core::scoring::{CompressionScorer, ScoreOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, info_span, warn};

/// What happened to one symbol before ranking.
#[derive(Debug)]
enum Processed {
    Accepted(ScanResult),
    Discarded(Discarded),
    Failed(FetchFailure),
    Skipped(String),
}

impl Processed {
    fn status(&self) -> Option<SymbolStatus> {
        match self {
            Processed::Accepted(r) => Some(SymbolStatus::Accepted { score: r.score() }),
            Processed::Discarded(_) => Some(SymbolStatus::Discarded),
            Processed::Failed(_) => Some(SymbolStatus::Failed),
            Processed::Skipped(_) => None,
        }
    }
}

pub struct Scanner<'a> {
    fetcher: HistoryFetcher<'a>,
    scorer: CompressionScorer,
    pacing: PacingConfig,
    workers: usize,
}

impl<'a> Scanner<'a> {
    /// Default fetch policy, pacing and scoring; sequential.
    pub fn new(provider: &'a dyn DataProvider) -> Self {
        Self {
            fetcher: HistoryFetcher::new(provider, FetchPolicy::default()),
            scorer: CompressionScorer::default(),
            pacing: PacingConfig::default(),
            workers: 1,
        }
    }

    /// Everything but `min_score` / `max_results`, which are passed to `run`.
    pub fn from_config(
        provider: &'a dyn DataProvider,
        config: &ScanConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            fetcher: HistoryFetcher::new(provider, config.fetch.clone()),
            scorer: CompressionScorer::new(config.scoring_policy())?,
            pacing: config.pacing.clone(),
            workers: config.scan.workers,
        })
    }

    pub fn with_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetcher = HistoryFetcher::new(self.fetcher.provider(), policy);
        self
    }

    pub fn with_pacing(mut self, pacing: PacingConfig) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_scorer(mut self, scorer: CompressionScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Zero is treated as one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn run(&self, symbols: &[String], min_score: u32, max_results: usize) -> ScanOutcome {
        self.run_with(symbols, min_score, max_results, &NoProgress, None)
    }

    /// Blocking scan with progress callbacks and cooperative cancellation.
    ///
    /// Once `cancel` is set no new fetch starts; symbols not yet started are
    /// reported in `skipped`.
    pub fn run_with(
        &self,
        symbols: &[String],
        min_score: u32,
        max_results: usize,
        progress: &dyn ScanProgress,
        cancel: Option<&AtomicBool>,
    ) -> ScanOutcome {
        let span = info_span!(
            "scan",
            symbols = symbols.len(),
            workers = self.workers,
            provider = self.fetcher.provider().name()
        );
        let _guard = span.enter();

        let processed = if self.workers > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
            {
                Ok(pool) => pool.install(|| self.run_parallel(symbols, min_score, progress, cancel)),
                Err(e) => {
                    warn!(error = %e, "could not build thread pool; scanning sequentially");
                    self.run_sequential(symbols, min_score, progress, cancel)
                }
            }
        } else {
            self.run_sequential(symbols, min_score, progress, cancel)
        };

        let outcome = finalize(processed, max_results);
        let summary = outcome.summary();
        info!(
            analyzed = summary.analyzed,
            failed = summary.failed,
            returned = summary.returned,
            skipped = outcome.skipped.len(),
            "scan finished"
        );
        progress.on_scan_complete(&summary);
        outcome
    }

    fn run_sequential(
        &self,
        symbols: &[String],
        min_score: u32,
        progress: &dyn ScanProgress,
        cancel: Option<&AtomicBool>,
    ) -> Vec<Processed> {
        let schedule = PauseSchedule::new(&self.pacing);
        let total = symbols.len();
        let mut processed = Vec::with_capacity(total);

        for (i, symbol) in symbols.iter().enumerate() {
            if is_cancelled(cancel) {
                debug!(remaining = total - i, "scan cancelled");
                processed.extend(symbols[i..].iter().cloned().map(Processed::Skipped));
                break;
            }

            // Bail out once the provider has blocked us.
            if !self.fetcher.provider().is_available() {
                warn!(remaining = total - i, "provider unavailable; not fetching the rest");
                processed.extend(symbols[i..].iter().map(|s| breaker_failure(s)));
                break;
            }

            let item = self.process_symbol(symbol, i, total, min_score, progress, None);
            processed.push(item);
            schedule.wait_after(i + 1);
        }

        processed
    }

    fn run_parallel(
        &self,
        symbols: &[String],
        min_score: u32,
        progress: &dyn ScanProgress,
        cancel: Option<&AtomicBool>,
    ) -> Vec<Processed> {
        let limiter = RateLimit::for_schedule(&PauseSchedule::new(&self.pacing));
        let total = symbols.len();

        symbols
            .par_iter()
            .enumerate()
            .map(|(i, symbol)| {
                if is_cancelled(cancel) {
                    return Processed::Skipped(symbol.clone());
                }
                if !self.fetcher.provider().is_available() {
                    return breaker_failure(symbol);
                }
                self.process_symbol(symbol, i, total, min_score, progress, limiter.as_ref())
            })
            .collect()
    }

    fn process_symbol(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        min_score: u32,
        progress: &dyn ScanProgress,
        limiter: Option<&RateLimit>,
    ) -> Processed {
        progress.on_start(symbol, index, total);
        let item = self.evaluate(symbol, min_score, limiter);
        if let Some(status) = item.status() {
            progress.on_complete(symbol, index, total, status);
        }
        item
    }

    fn evaluate(&self, symbol: &str, min_score: u32, limiter: Option<&RateLimit>) -> Processed {
        let series = match self.fetcher.fetch_paced(symbol, limiter) {
            Ok(series) => series,
            Err(failure) => return Processed::Failed(failure),
        };

        let discard = |reason| {
            Processed::Discarded(Discarded {
                symbol: symbol.to_string(),
                reason,
            })
        };

        match self.scorer.evaluate(&series) {
            ScoreOutcome::Scored(metrics) if metrics.score >= min_score => {
                debug!(symbol, score = metrics.score, "accepted");
                Processed::Accepted(ScanResult {
                    symbol: symbol.to_string(),
                    metrics,
                })
            }
            ScoreOutcome::Scored(metrics) => discard(DiscardReason::BelowThreshold {
                score: metrics.score,
            }),
            ScoreOutcome::InsufficientHistory { bars } => {
                debug!(symbol, bars, "not enough history");
                discard(DiscardReason::InsufficientHistory { bars })
            }
            ScoreOutcome::Anomaly { reason } => {
                warn!(symbol, %reason, "could not score series");
                discard(DiscardReason::Anomaly { detail: reason })
            }
        }
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

fn breaker_failure(symbol: &str) -> Processed {
    Processed::Failed(FetchFailure::new(
        symbol,
        0,
        &DataError::CircuitBreakerTripped,
    ))
}

/// Rank accepted symbols (stable, descending) and keep the top `max_results`.
fn finalize(processed: Vec<Processed>, max_results: usize) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    let mut accepted = Vec::new();

    for item in processed {
        match item {
            Processed::Accepted(result) => accepted.push(result),
            Processed::Discarded(d) => outcome.discarded.push(d),
            Processed::Failed(f) => outcome.failures.push(f),
            Processed::Skipped(s) => outcome.skipped.push(s),
        }
    }

    accepted.sort_by(|a, b| b.score().cmp(&a.score()));
    if accepted.len() > max_results {
        outcome
            .discarded
            .extend(accepted.drain(max_results..).map(|r| Discarded {
                reason: DiscardReason::RankCutoff { score: r.score() },
                symbol: r.symbol,
            }));
    }
    outcome.results = accepted;
    outcome
}

/// Scan `symbols` with every default: two attempts, 10 s timeout, fixed
/// pacing, default scoring policy, one worker.
pub fn run_scan(
    provider: &dyn DataProvider,
    symbols: &[String],
    min_score: u32,
    max_results: usize,
) -> ScanOutcome {
    Scanner::new(provider).run(symbols, min_score, max_results)
}
