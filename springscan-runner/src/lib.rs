//! SpringScan Runner — scan orchestration on top of `springscan-core`.
//!
//! This crate provides:
//! - `ScanConfig` loaded from TOML, with a content fingerprint
//! - `HistoryFetcher`: bounded retry around a `DataProvider`
//! - Pacing: fixed pauses (sequential) or a shared token bucket (parallel)
//! - `Scanner`: fetch, score, rank and truncate a symbol list
//! - Outcome types with a summary and a diagnosis for presentation
//! - CSV and JSON export

pub mod config;
pub mod export;
pub mod fetcher;
pub mod outcome;
pub mod pacing;
pub mod progress;
pub mod scanner;

pub use config::{ConfigError, FetchPolicy, PacingConfig, ScanConfig, ScanSettings};
pub use export::{default_csv_name, export_json, export_results_csv, write_results_csv, ExportError};
pub use fetcher::{FetchFailure, HistoryFetcher};
pub use outcome::{Diagnosis, DiscardReason, Discarded, ScanOutcome, ScanResult, ScanSummary};
pub use pacing::{PauseSchedule, RateLimit};
pub use progress::{NoProgress, ScanProgress, StderrProgress, SymbolStatus};
pub use scanner::{run_scan, Scanner};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ScanConfig>();
        assert_sync::<ScanConfig>();
        assert_send::<FetchPolicy>();
        assert_sync::<FetchPolicy>();
    }

    #[test]
    fn scanner_is_send_sync() {
        assert_send::<Scanner<'static>>();
        assert_sync::<Scanner<'static>>();
        assert_send::<HistoryFetcher<'static>>();
        assert_sync::<HistoryFetcher<'static>>();
    }

    #[test]
    fn rate_limit_is_send_sync() {
        assert_send::<RateLimit>();
        assert_sync::<RateLimit>();
    }

    #[test]
    fn outcome_types_are_send_sync() {
        assert_send::<ScanOutcome>();
        assert_sync::<ScanOutcome>();
        assert_send::<ScanSummary>();
        assert_sync::<ScanSummary>();
    }
}
