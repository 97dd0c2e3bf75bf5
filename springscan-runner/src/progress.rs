//! Progress reporting for scans.
//!
//! Callbacks are observation only; they never change what a scan returns.
//! In parallel mode they fire from worker threads, in completion order.

use crate::outcome::ScanSummary;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What happened to one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolStatus {
    Accepted { score: u32 },
    Discarded,
    Failed,
}

pub trait ScanProgress: Send + Sync {
    /// Called before a symbol is fetched.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol has been fetched and scored, or has failed.
    fn on_complete(&self, symbol: &str, index: usize, total: usize, status: SymbolStatus);

    /// Called once the outcome is final.
    fn on_scan_complete(&self, summary: &ScanSummary);
}

/// Discards every event.
pub struct NoProgress;

impl ScanProgress for NoProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}

    fn on_complete(&self, _symbol: &str, _index: usize, _total: usize, _status: SymbolStatus) {}

    fn on_scan_complete(&self, _summary: &ScanSummary) {}
}

/// One line per finished symbol on stderr, so stdout stays clean for results.
#[derive(Default)]
pub struct StderrProgress {
    done: AtomicUsize,
}

impl StderrProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScanProgress for StderrProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}

    fn on_complete(&self, symbol: &str, _index: usize, total: usize, status: SymbolStatus) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        match status {
            SymbolStatus::Accepted { score } => {
                eprintln!("[{done}/{total}] {symbol}: score {score}")
            }
            SymbolStatus::Discarded => eprintln!("[{done}/{total}] {symbol}: no signal"),
            SymbolStatus::Failed => eprintln!("[{done}/{total}] {symbol}: FAILED"),
        }
    }

    fn on_scan_complete(&self, summary: &ScanSummary) {
        eprintln!(
            "\nScan complete: {} analyzed, {} failed, {} returned",
            summary.analyzed, summary.failed, summary.returned
        );
    }
}
