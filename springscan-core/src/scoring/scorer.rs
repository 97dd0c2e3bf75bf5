//! Compression scorer.
//!
//! Five independent factors add up to a 0–100 score:
//!
//! | factor         | metric                                         |
//! |----------------|------------------------------------------------|
//! | volatility     | ATR(14) now / mean ATR(14) over last 60 bars   |
//! | range          | 10-bar high-low span / 10-bar mean close, %    |
//! | volume         | 5-bar mean volume / 20-bar mean volume         |
//! | ma_proximity   | \|close - SMA(50)\| / SMA(50), %               |
//! | consolidation  | 20-bar high-low span / last close, %           |
//!
//! Points per factor come from the `ScoringPolicy` band tables. A factor whose
//! denominator is zero (or not finite) earns nothing and reports a ratio of 0.

use super::bands::{BandTable, PolicyError, ScoringPolicy};
use super::metrics::{ScoreBreakdown, ScoreMetrics};
use crate::domain::{Bar, BarSeries};
use crate::indicators::{finite_mean, Atr, Indicator, Sma};

/// Bars required before a series is scored at all.
pub const MIN_BARS: usize = 60;
pub const ATR_PERIOD: usize = 14;
pub const ATR_BASELINE_BARS: usize = 60;
pub const RANGE_BARS: usize = 10;
pub const VOLUME_SHORT_BARS: usize = 5;
pub const VOLUME_LONG_BARS: usize = 20;
pub const MA_PERIOD: usize = 50;
pub const CONSOLIDATION_BARS: usize = 20;

/// What scoring a series produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Scored(ScoreMetrics),
    /// Fewer than `MIN_BARS` bars. Not an error: there is simply no signal.
    InsufficientHistory { bars: usize },
    /// The data survived the length check but could not be scored.
    Anomaly { reason: String },
}

impl ScoreOutcome {
    pub fn metrics(&self) -> Option<&ScoreMetrics> {
        match self {
            ScoreOutcome::Scored(m) => Some(m),
            _ => None,
        }
    }

    pub fn into_metrics(self) -> Option<ScoreMetrics> {
        match self {
            ScoreOutcome::Scored(m) => Some(m),
            _ => None,
        }
    }
}

/// Stateless: the same series always yields the same outcome.
#[derive(Debug, Clone, Default)]
pub struct CompressionScorer {
    policy: ScoringPolicy,
}

impl CompressionScorer {
    pub fn new(policy: ScoringPolicy) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// `Some(metrics)` only when the series could be scored.
    pub fn score(&self, series: &BarSeries) -> Option<ScoreMetrics> {
        self.evaluate(series).into_metrics()
    }

    pub fn evaluate(&self, series: &BarSeries) -> ScoreOutcome {
        self.evaluate_bars(series.bars())
    }

    pub fn evaluate_bars(&self, bars: &[Bar]) -> ScoreOutcome {
        if bars.len() < MIN_BARS {
            return ScoreOutcome::InsufficientHistory { bars: bars.len() };
        }
        match self.compute(bars) {
            Ok(metrics) => ScoreOutcome::Scored(metrics),
            Err(reason) => ScoreOutcome::Anomaly { reason },
        }
    }

    fn compute(&self, bars: &[Bar]) -> Result<ScoreMetrics, String> {
        let offset = bars.len() - MIN_BARS;
        if let Some((i, bar)) = tail(bars, MIN_BARS)
            .iter()
            .enumerate()
            .find(|(_, bar)| !is_scorable(bar))
        {
            return Err(format!(
                "bar {} ({}) has a non-finite or negative price",
                offset + i,
                bar.date
            ));
        }

        let last = &bars[bars.len() - 1];
        let prev = &bars[bars.len() - 2];
        let price = last.close;

        // One ATR pass serves both the latest value and the baseline window.
        let atr = Atr::new(ATR_PERIOD).compute(bars);
        let atr_latest = atr[atr.len() - 1];
        let atr_ratio = finite_mean(&atr[atr.len() - ATR_BASELINE_BARS..])
            .and_then(|base| ratio(atr_latest, base));

        let range_bars = tail(bars, RANGE_BARS);
        let range_10d = ratio(span(range_bars), mean_close(range_bars)).map(|r| r * 100.0);

        let volume_ratio = ratio(
            mean_volume(tail(bars, VOLUME_SHORT_BARS)),
            mean_volume(tail(bars, VOLUME_LONG_BARS)),
        );

        let sma = Sma::new(MA_PERIOD).latest(bars);
        let distance_ma50 = ratio((price - sma).abs(), sma).map(|r| r * 100.0);

        let consolidation = ratio(span(tail(bars, CONSOLIDATION_BARS)), price).map(|r| r * 100.0);

        let points =
            |value: Option<f64>, table: &BandTable| value.map_or(0, |v| table.points_for(v));
        let breakdown = ScoreBreakdown {
            volatility: points(atr_ratio, &self.policy.volatility),
            range: points(range_10d, &self.policy.range),
            volume: points(volume_ratio, &self.policy.volume),
            ma_proximity: points(distance_ma50, &self.policy.ma_proximity),
            consolidation: points(consolidation, &self.policy.consolidation),
        };

        let metrics = ScoreMetrics {
            price,
            daily_change_pct: ratio(price - prev.close, prev.close).map_or(0.0, |r| r * 100.0),
            atr_ratio: atr_ratio.unwrap_or(0.0),
            range_10d_pct: range_10d.unwrap_or(0.0),
            volume_ratio: volume_ratio.unwrap_or(0.0),
            distance_ma50_pct: distance_ma50.unwrap_or(0.0),
            consolidation_range_pct: consolidation.unwrap_or(0.0),
            volume_vs_avg: ratio(last.volume as f64, mean_volume(tail(bars, VOLUME_LONG_BARS)))
                .unwrap_or(0.0),
            score: breakdown.total(),
            breakdown,
        };

        if !metrics.all_finite() {
            return Err("a derived metric is not finite".into());
        }
        Ok(metrics)
    }
}

fn is_scorable(bar: &Bar) -> bool {
    !bar.is_void() && bar.open >= 0.0 && bar.high >= 0.0 && bar.low >= 0.0 && bar.close >= 0.0
}

fn tail(bars: &[Bar], n: usize) -> &[Bar] {
    &bars[bars.len().saturating_sub(n)..]
}

/// `num / den`, or `None` when the denominator is zero, negative or not finite.
fn ratio(num: f64, den: f64) -> Option<f64> {
    if den.is_finite() && den > 0.0 && num.is_finite() {
        Some(num / den)
    } else {
        None
    }
}

/// Highest high minus lowest low.
fn span(bars: &[Bar]) -> f64 {
    let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    high - low
}

fn mean_close(bars: &[Bar]) -> f64 {
    bars.iter().map(|b| b.close).sum::<f64>() / bars.len() as f64
}

fn mean_volume(bars: &[Bar]) -> f64 {
    bars.iter().map(|b| b.volume as f64).sum::<f64>() / bars.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;
    use chrono::NaiveDate;

    /// Flat closes at `close`; bar i spans `ranges[i]` around it.
    fn flat_bars(close: f64, ranges: &[f64], volume: u64) -> Vec<Bar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ranges
            .iter()
            .enumerate()
            .map(|(i, &r)| Bar {
                date: base + chrono::Duration::days(i as i64),
                open: close,
                high: close + r / 2.0,
                low: close - r / 2.0,
                close,
                volume,
            })
            .collect()
    }

    fn series(bars: Vec<Bar>) -> BarSeries {
        BarSeries::new("TEST", bars).unwrap()
    }

    #[test]
    fn fifty_nine_bars_is_insufficient() {
        let bars = flat_bars(100.0, &[1.0; 59], 1000);
        let scorer = CompressionScorer::default();
        assert_eq!(
            scorer.evaluate_bars(&bars),
            ScoreOutcome::InsufficientHistory { bars: 59 }
        );
        assert!(scorer.score(&series(bars)).is_none());
    }

    #[test]
    fn empty_series_is_insufficient() {
        let scorer = CompressionScorer::default();
        assert_eq!(
            scorer.evaluate_bars(&[]),
            ScoreOutcome::InsufficientHistory { bars: 0 }
        );
    }

    #[test]
    fn contracting_ranges_score_high() {
        // Bar ranges shrink from 6.0 to 0.1 while closes stay at 100.
        let ranges: Vec<f64> = (0..60).map(|i| 6.0 - i as f64 * 0.1).collect();
        let bars = flat_bars(100.0, &ranges, 5000);
        let m = CompressionScorer::default().score(&series(bars)).unwrap();

        assert!(m.atr_ratio < 0.70, "atr_ratio = {}", m.atr_ratio);
        assert_eq!(m.breakdown.volatility, 30);
        // 10-bar span is the widest of the last ten bars: 1.0 around 100.
        assert_approx(m.range_10d_pct, 1.0, 1e-9);
        assert_eq!(m.breakdown.range, 25);
        // Flat volume: ratio exactly 1.0 earns nothing.
        assert_approx(m.volume_ratio, 1.0, 1e-12);
        assert_eq!(m.breakdown.volume, 0);
        assert_approx(m.distance_ma50_pct, 0.0, 1e-12);
        assert_eq!(m.breakdown.ma_proximity, 15);
        assert_approx(m.consolidation_range_pct, 2.0, 1e-9);
        assert_eq!(m.breakdown.consolidation, 10);

        assert_eq!(m.score, 80);
        assert!(m.score >= 80);
        assert_eq!(m.daily_change_pct, 0.0);
        assert_approx(m.volume_vs_avg, 1.0, 1e-12);
    }

    #[test]
    fn constant_volatility_earns_no_volatility_points() {
        let bars = flat_bars(100.0, &[4.0; 60], 1000);
        let m = CompressionScorer::default().score(&series(bars)).unwrap();
        assert_approx(m.atr_ratio, 1.0, 1e-12);
        assert_eq!(m.breakdown.volatility, 0);
    }

    #[test]
    fn falling_volume_earns_volume_points() {
        let mut bars = flat_bars(100.0, &[4.0; 60], 1000);
        for bar in bars.iter_mut().rev().take(5) {
            bar.volume = 500;
        }
        let m = CompressionScorer::default().score(&series(bars)).unwrap();
        // 5-bar mean 500, 20-bar mean (15*1000 + 5*500)/20 = 875.
        assert_approx(m.volume_ratio, 500.0 / 875.0, 1e-12);
        assert_eq!(m.breakdown.volume, 20);
        assert_approx(m.volume_vs_avg, 500.0 / 875.0, 1e-12);
    }

    #[test]
    fn daily_change_uses_last_two_closes() {
        let mut bars = flat_bars(100.0, &[1.0; 60], 1000);
        let last = bars.len() - 1;
        bars[last].close = 102.0;
        bars[last].high = 102.5;
        let m = CompressionScorer::default().score(&series(bars)).unwrap();
        assert_approx(m.daily_change_pct, 2.0, 1e-12);
        assert_eq!(m.price, 102.0);
    }

    #[test]
    fn zero_volume_reports_zero_ratios() {
        let bars = flat_bars(100.0, &[1.0; 60], 0);
        let m = CompressionScorer::default().score(&series(bars)).unwrap();
        assert_eq!(m.volume_ratio, 0.0);
        assert_eq!(m.volume_vs_avg, 0.0);
        assert_eq!(m.breakdown.volume, 0);
    }

    #[test]
    fn zero_ranges_guard_atr_denominator() {
        // No movement at all: mean ATR is zero, so the factor is skipped.
        let bars = flat_bars(100.0, &[0.0; 60], 1000);
        let m = CompressionScorer::default().score(&series(bars)).unwrap();
        assert_eq!(m.atr_ratio, 0.0);
        assert_eq!(m.breakdown.volatility, 0);
        assert_eq!(m.score, m.breakdown.total());
    }

    #[test]
    fn zero_prices_guard_every_denominator() {
        let bars = flat_bars(0.0, &[0.0; 60], 1000);
        let m = CompressionScorer::default().score(&series(bars)).unwrap();
        assert_eq!(m.range_10d_pct, 0.0);
        assert_eq!(m.distance_ma50_pct, 0.0);
        assert_eq!(m.consolidation_range_pct, 0.0);
        assert_eq!(m.daily_change_pct, 0.0);
        assert_eq!(m.breakdown.range, 0);
        assert_eq!(m.breakdown.ma_proximity, 0);
        assert_eq!(m.breakdown.consolidation, 0);
        assert_eq!(m.breakdown.volatility, 0);
    }

    #[test]
    fn nan_in_window_is_anomaly() {
        let mut bars = flat_bars(100.0, &[1.0; 60], 1000);
        bars[45].close = f64::NAN;
        let outcome = CompressionScorer::default().evaluate_bars(&bars);
        match outcome {
            ScoreOutcome::Anomaly { reason } => assert!(reason.contains("bar 45")),
            other => panic!("expected anomaly, got {other:?}"),
        }
        assert!(CompressionScorer::default().score(&series(bars)).is_none());
    }

    #[test]
    fn negative_price_is_anomaly() {
        let mut bars = flat_bars(100.0, &[1.0; 60], 1000);
        bars[59].low = -1.0;
        assert!(matches!(
            CompressionScorer::default().evaluate_bars(&bars),
            ScoreOutcome::Anomaly { .. }
        ));
    }

    #[test]
    fn bad_bars_before_the_window_are_tolerated() {
        let mut ranges = vec![2.0; 70];
        ranges[70 - 1] = 1.0;
        let mut bars = flat_bars(100.0, &ranges, 1000);
        bars[0].high = f64::NAN;
        let outcome = CompressionScorer::default().evaluate_bars(&bars);
        assert!(matches!(outcome, ScoreOutcome::Scored(_)), "{outcome:?}");
    }

    #[test]
    fn scoring_is_idempotent() {
        let ranges: Vec<f64> = (0..75).map(|i| 1.0 + (i as f64 * 0.7).sin().abs()).collect();
        let s = series(flat_bars(50.0, &ranges, 2000));
        let scorer = CompressionScorer::default();
        assert_eq!(scorer.score(&s), scorer.score(&s));
    }

    #[test]
    fn custom_policy_changes_points_not_metrics() {
        let bars = flat_bars(100.0, &[4.0; 60], 1000);
        let mut policy = ScoringPolicy::default();
        policy.range = BandTable::new([(10.0, 25)]);
        let strict = CompressionScorer::default().score(&series(bars.clone())).unwrap();
        let loose = CompressionScorer::new(policy).unwrap().score(&series(bars)).unwrap();
        assert_eq!(strict.range_10d_pct, loose.range_10d_pct);
        assert_eq!(strict.breakdown.range, 25);
        assert_eq!(loose.breakdown.range, 25);
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let mut policy = ScoringPolicy::default();
        policy.volatility = BandTable::new([(1.0, 90)]);
        assert!(CompressionScorer::new(policy).is_err());
    }
}
