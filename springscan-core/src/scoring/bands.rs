//! Score band tables.
//!
//! Each factor maps its metric to points through a `BandTable`: an ordered
//! list of `(below, points)` pairs. A value earns the points of the first band
//! whose `below` it is strictly under, and nothing otherwise. The default
//! policy reproduces the standard compression table (30/25/20/15/10).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest total a policy may award.
pub const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub below: f64,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandTable {
    bands: Vec<Band>,
}

impl BandTable {
    pub fn new(bands: impl IntoIterator<Item = (f64, u32)>) -> Self {
        Self {
            bands: bands
                .into_iter()
                .map(|(below, points)| Band { below, points })
                .collect(),
        }
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Points for `value`. NaN never matches a band.
    pub fn points_for(&self, value: f64) -> u32 {
        self.bands
            .iter()
            .find(|band| value < band.below)
            .map_or(0, |band| band.points)
    }

    /// Most points this table can award.
    pub fn max_points(&self) -> u32 {
        self.bands.iter().map(|b| b.points).max().unwrap_or(0)
    }

    fn validate(&self, factor: &'static str) -> Result<(), PolicyError> {
        for band in &self.bands {
            if !band.below.is_finite() {
                return Err(PolicyError::NonFiniteThreshold { factor });
            }
        }
        for pair in self.bands.windows(2) {
            if pair[1].below <= pair[0].below {
                return Err(PolicyError::ThresholdsNotAscending { factor });
            }
            if pair[1].points > pair[0].points {
                return Err(PolicyError::PointsIncreasing { factor });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("{factor}: band thresholds must be finite")]
    NonFiniteThreshold { factor: &'static str },

    #[error("{factor}: band thresholds must be strictly ascending")]
    ThresholdsNotAscending { factor: &'static str },

    #[error("{factor}: tighter bands must not award fewer points than looser ones")]
    PointsIncreasing { factor: &'static str },

    #[error("policy awards up to {total} points, more than 100")]
    TotalTooHigh { total: u32 },
}

/// Band tables for the five compression factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// ATR(14) now vs its trailing-60 mean.
    pub volatility: BandTable,
    /// 10-bar high-low range as % of mean close.
    pub range: BandTable,
    /// 5-bar vs 20-bar mean volume.
    pub volume: BandTable,
    /// Distance of the last close from SMA(50), %.
    pub ma_proximity: BandTable,
    /// 20-bar high-low range as % of last close.
    pub consolidation: BandTable,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            volatility: BandTable::new([(0.70, 30), (0.85, 20), (1.00, 10)]),
            range: BandTable::new([(5.0, 25), (8.0, 15), (12.0, 5)]),
            volume: BandTable::new([(0.80, 20), (0.90, 12), (1.00, 5)]),
            ma_proximity: BandTable::new([(3.0, 15), (5.0, 10), (8.0, 5)]),
            consolidation: BandTable::new([(8.0, 10), (12.0, 5)]),
        }
    }
}

impl ScoringPolicy {
    fn tables(&self) -> [(&'static str, &BandTable); 5] {
        [
            ("volatility", &self.volatility),
            ("range", &self.range),
            ("volume", &self.volume),
            ("ma_proximity", &self.ma_proximity),
            ("consolidation", &self.consolidation),
        ]
    }

    pub fn max_total(&self) -> u32 {
        self.tables().iter().map(|(_, t)| t.max_points()).sum()
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        for (factor, table) in self.tables() {
            table.validate(factor)?;
        }
        let total = self.max_total();
        if total > MAX_SCORE {
            return Err(PolicyError::TotalTooHigh { total });
        }
        Ok(())
    }
}
