//! Per-symbol score metrics.

use serde::{Deserialize, Serialize};

/// Points earned by each factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub volatility: u32,
    pub range: u32,
    pub volume: u32,
    pub ma_proximity: u32,
    pub consolidation: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.volatility + self.range + self.volume + self.ma_proximity + self.consolidation
    }
}

/// Everything the scorer derives for one symbol in one scan.
///
/// Ratios whose denominator was zero are reported as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetrics {
    /// Last close.
    pub price: f64,
    /// Last close vs the one before, %.
    pub daily_change_pct: f64,
    /// ATR(14) now / mean ATR(14) over the trailing 60 bars.
    pub atr_ratio: f64,
    /// 10-bar high-low range / 10-bar mean close, %.
    pub range_10d_pct: f64,
    /// 5-bar mean volume / 20-bar mean volume.
    pub volume_ratio: f64,
    /// |close - SMA(50)| / SMA(50), %.
    pub distance_ma50_pct: f64,
    /// 20-bar high-low range / last close, %.
    pub consolidation_range_pct: f64,
    /// Last volume / 20-bar mean volume.
    pub volume_vs_avg: f64,
    pub score: u32,
    pub breakdown: ScoreBreakdown,
}

impl ScoreMetrics {
    pub fn tier(&self) -> CompressionTier {
        CompressionTier::from_score(self.score)
    }

    pub(crate) fn all_finite(&self) -> bool {
        [
            self.price,
            self.daily_change_pct,
            self.atr_ratio,
            self.range_10d_pct,
            self.volume_ratio,
            self.distance_ma50_pct,
            self.consolidation_range_pct,
            self.volume_vs_avg,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Reading of a score for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionTier {
    /// 80 and above: tightly wound, high priority.
    Strong,
    /// 60 to 79: worth monitoring.
    Moderate,
    /// Below 60.
    Weak,
}

impl CompressionTier {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => CompressionTier::Strong,
            60..=79 => CompressionTier::Moderate,
            _ => CompressionTier::Weak,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompressionTier::Strong => "strong",
            CompressionTier::Moderate => "moderate",
            CompressionTier::Weak => "weak",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakdown_total_sums_factors() {
        let b = ScoreBreakdown {
            volatility: 30,
            range: 15,
            volume: 5,
            ma_proximity: 10,
            consolidation: 0,
        };
        assert_eq!(b.total(), 60);
        assert_eq!(ScoreBreakdown::default().total(), 0);
    }

    #[test]
    fn tiers_follow_score_bands() {
        assert_eq!(CompressionTier::from_score(100), CompressionTier::Strong);
        assert_eq!(CompressionTier::from_score(80), CompressionTier::Strong);
        assert_eq!(CompressionTier::from_score(79), CompressionTier::Moderate);
        assert_eq!(CompressionTier::from_score(60), CompressionTier::Moderate);
        assert_eq!(CompressionTier::from_score(59), CompressionTier::Weak);
        assert_eq!(CompressionTier::from_score(0), CompressionTier::Weak);
    }
}
