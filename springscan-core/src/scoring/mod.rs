//! Compression scoring: band tables, metrics and the scorer itself.

pub mod bands;
pub mod metrics;
pub mod scorer;

pub use bands::{Band, BandTable, PolicyError, ScoringPolicy, MAX_SCORE};
pub use metrics::{CompressionTier, ScoreBreakdown, ScoreMetrics};
pub use scorer::{CompressionScorer, ScoreOutcome, MIN_BARS};
