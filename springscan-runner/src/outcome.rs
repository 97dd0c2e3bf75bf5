//! Scan outcome: every input symbol lands in exactly one bucket.

use crate::fetcher::FetchFailure;
use serde::{Deserialize, Serialize};
use springscan_core::scoring::{CompressionTier, ScoreMetrics};

/// A symbol that made the ranked list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbol: String,
    pub metrics: ScoreMetrics,
}

impl ScanResult {
    pub fn score(&self) -> u32 {
        self.metrics.score
    }

    pub fn tier(&self) -> CompressionTier {
        self.metrics.tier()
    }
}

/// Why a fetched symbol is not in the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DiscardReason {
    InsufficientHistory { bars: usize },
    Anomaly { detail: String },
    BelowThreshold { score: u32 },
    /// Scored high enough but fell past `max_results`.
    RankCutoff { score: u32 },
}

impl DiscardReason {
    /// The score, for reasons that have one.
    pub fn score(&self) -> Option<u32> {
        match self {
            DiscardReason::BelowThreshold { score } | DiscardReason::RankCutoff { score } => {
                Some(*score)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discarded {
    pub symbol: String,
    #[serde(flatten)]
    pub reason: DiscardReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// Descending by score, ties in input order, at most `max_results`.
    pub results: Vec<ScanResult>,
    pub failures: Vec<FetchFailure>,
    pub discarded: Vec<Discarded>,
    /// Never attempted because the scan was cancelled.
    pub skipped: Vec<String>,
}

impl ScanOutcome {
    /// Symbols accounted for across all buckets.
    pub fn total(&self) -> usize {
        self.results.len() + self.failures.len() + self.discarded.len() + self.skipped.len()
    }

    /// Symbols whose series was fetched, whatever happened next.
    pub fn analyzed(&self) -> usize {
        self.results.len() + self.discarded.len()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|r| r.symbol.as_str())
    }

    pub fn summary(&self) -> ScanSummary {
        let scores: Vec<u32> = self.results.iter().map(ScanResult::score).collect();
        let mean_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64)
        };
        ScanSummary {
            total: self.total(),
            analyzed: self.analyzed(),
            failed: self.failures.len(),
            returned: self.results.len(),
            mean_score,
            max_score: scores.iter().copied().max(),
        }
    }

    pub fn diagnosis(&self) -> Diagnosis {
        if !self.results.is_empty() {
            Diagnosis::Found
        } else if self.failures.len() > self.analyzed() {
            Diagnosis::ConnectivityProblem
        } else {
            Diagnosis::NothingAboveThreshold
        }
    }
}

/// Headline numbers for a finished scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: usize,
    pub analyzed: usize,
    pub failed: usize,
    pub returned: usize,
    pub mean_score: Option<f64>,
    pub max_score: Option<u32>,
}

/// What an empty or non-empty result most likely means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnosis {
    Found,
    /// Data came back; nothing cleared the threshold.
    NothingAboveThreshold,
    /// Most symbols could not be fetched at all.
    ConnectivityProblem,
}

impl Diagnosis {
    pub fn hint(&self) -> &'static str {
        match self {
            Diagnosis::Found => "",
            Diagnosis::NothingAboveThreshold => {
                "no symbol reached the minimum score; try a lower --min-score"
            }
            Diagnosis::ConnectivityProblem => {
                "most symbols could not be fetched; check the network or provider status"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use springscan_core::scoring::ScoreBreakdown;

    fn result(symbol: &str, score: u32) -> ScanResult {
        ScanResult {
            symbol: symbol.into(),
            metrics: ScoreMetrics {
                price: 10.0,
                daily_change_pct: 0.0,
                atr_ratio: 0.5,
                range_10d_pct: 3.0,
                volume_ratio: 0.7,
                distance_ma50_pct: 1.0,
                consolidation_range_pct: 4.0,
                volume_vs_avg: 0.9,
                score,
                breakdown: ScoreBreakdown::default(),
            },
        }
    }

    fn failure(symbol: &str) -> FetchFailure {
        FetchFailure {
            symbol: symbol.into(),
            attempts: 2,
            last_error: "timed out".into(),
        }
    }

    #[test]
    fn summary_of_empty_outcome() {
        let summary = ScanOutcome::default().summary();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.mean_score, None);
        assert_eq!(summary.max_score, None);
    }

    #[test]
    fn summary_counts_buckets() {
        let outcome = ScanOutcome {
            results: vec![result("A", 90), result("B", 70)],
            failures: vec![failure("C")],
            discarded: vec![Discarded {
                symbol: "D".into(),
                reason: DiscardReason::BelowThreshold { score: 20 },
            }],
            skipped: vec!["E".into()],
        };
        let summary = outcome.summary();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.analyzed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.returned, 2);
        assert_eq!(summary.mean_score, Some(80.0));
        assert_eq!(summary.max_score, Some(90));
        assert_eq!(outcome.diagnosis(), Diagnosis::Found);
        assert_eq!(outcome.symbols().collect::<Vec<_>>(), ["A", "B"]);
    }

    #[test]
    fn diagnosis_separates_connectivity_from_threshold() {
        let mostly_failed = ScanOutcome {
            failures: vec![failure("A"), failure("B")],
            discarded: vec![Discarded {
                symbol: "C".into(),
                reason: DiscardReason::InsufficientHistory { bars: 12 },
            }],
            ..Default::default()
        };
        assert_eq!(mostly_failed.diagnosis(), Diagnosis::ConnectivityProblem);

        let all_low = ScanOutcome {
            failures: vec![failure("A")],
            discarded: vec![
                Discarded {
                    symbol: "B".into(),
                    reason: DiscardReason::BelowThreshold { score: 10 },
                },
                Discarded {
                    symbol: "C".into(),
                    reason: DiscardReason::BelowThreshold { score: 40 },
                },
            ],
            ..Default::default()
        };
        assert_eq!(all_low.diagnosis(), Diagnosis::NothingAboveThreshold);
        assert!(!all_low.diagnosis().hint().is_empty());
    }

    #[test]
    fn discarded_serializes_flat() {
        let d = Discarded {
            symbol: "X".into(),
            reason: DiscardReason::RankCutoff { score: 75 },
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["symbol"], "X");
        assert_eq!(json["reason"], "rank_cutoff");
        assert_eq!(json["score"], 75);
        assert_eq!(d.reason.score(), Some(75));
    }
}
