//! Result export: CSV for spreadsheets, JSON for everything else.
//!
//! CSV columns: Ticker, Score, Price, Change %, ATR Ratio, Range 10d %,
//! Vol Ratio, Dist MA50 %, Vol vs Avg. Numbers carry two decimals.

use crate::outcome::ScanOutcome;
use chrono::NaiveDateTime;
use std::path::Path;
use thiserror::Error;

pub const CSV_HEADER: [&str; 9] = [
    "Ticker",
    "Score",
    "Price",
    "Change %",
    "ATR Ratio",
    "Range 10d %",
    "Vol Ratio",
    "Dist MA50 %",
    "Vol vs Avg",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV output is not valid UTF-8")]
    Utf8,
}

/// `market_scan_YYYYMMDD_HHMM.csv`
pub fn default_csv_name(now: NaiveDateTime) -> String {
    format!("market_scan_{}.csv", now.format("%Y%m%d_%H%M"))
}

/// Ranked results as CSV text, header included.
pub fn export_results_csv(outcome: &ScanOutcome) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for result in &outcome.results {
        let m = &result.metrics;
        wtr.write_record([
            result.symbol.clone(),
            m.score.to_string(),
            format!("{:.2}", m.price),
            format!("{:.2}", m.daily_change_pct),
            format!("{:.2}", m.atr_ratio),
            format!("{:.2}", m.range_10d_pct),
            format!("{:.2}", m.volume_ratio),
            format!("{:.2}", m.distance_ma50_pct),
            format!("{:.2}", m.volume_vs_avg),
        ])?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Write {
            path: "<memory>".into(),
            source: e.into_error(),
        })?;
    String::from_utf8(bytes).map_err(|_| ExportError::Utf8)
}

pub fn write_results_csv(path: &Path, outcome: &ScanOutcome) -> Result<(), ExportError> {
    let csv = export_results_csv(outcome)?;
    std::fs::write(path, csv).map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// The whole outcome (all buckets) as pretty JSON.
pub fn export_json(outcome: &ScanOutcome) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(outcome)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ScanResult;
    use springscan_core::scoring::{ScoreBreakdown, ScoreMetrics};

    fn outcome() -> ScanOutcome {
        ScanOutcome {
            results: vec![ScanResult {
                symbol: "ENI.MI".into(),
                metrics: ScoreMetrics {
                    price: 14.2567,
                    daily_change_pct: -0.4321,
                    atr_ratio: 0.61234,
                    range_10d_pct: 3.456,
                    volume_ratio: 0.789,
                    distance_ma50_pct: 1.005,
                    consolidation_range_pct: 5.5,
                    volume_vs_avg: 0.9,
                    score: 85,
                    breakdown: ScoreBreakdown::default(),
                },
            }],
            ..Default::default()
        }
    }

    #[test]
    fn csv_has_header_and_two_decimals() {
        let csv = export_results_csv(&outcome()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Ticker,Score,Price,Change %,ATR Ratio,Range 10d %,Vol Ratio,Dist MA50 %,Vol vs Avg"
        );
        assert_eq!(
            lines.next().unwrap(),
            "ENI.MI,85,14.26,-0.43,0.61,3.46,0.79,1.00,0.90"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_outcome_is_header_only() {
        let csv = export_results_csv(&ScanOutcome::default()).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn writes_file_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.csv");
        write_results_csv(&path, &outcome()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Ticker,Score"));
        assert!(content.contains("ENI.MI,85"));
    }

    #[test]
    fn default_name_uses_minute_timestamp() {
        let now = chrono::NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 59)
            .unwrap();
        assert_eq!(default_csv_name(now), "market_scan_20240307_0905.csv");
    }

    #[test]
    fn json_carries_metrics() {
        let json = export_json(&outcome()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["results"][0]["symbol"], "ENI.MI");
        assert_eq!(value["results"][0]["metrics"]["score"], 85);
    }
}
