//! Synthetic provider for offline runs and demos.
//!
//! Each symbol gets a deterministic random walk seeded from a BLAKE3 hash of
//! its name. Roughly a third of symbols land in a contracting regime (daily
//! volatility and volume decay toward the end of the window) so that a demo
//! scan has something to find. Results built on this data are fake.

use super::provider::{DataError, DataProvider, Lookback};
use crate::domain::{Bar, BarSeries};
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    end: NaiveDate,
}

impl SyntheticProvider {
    /// Series end on `end` (inclusive, weekends skipped).
    pub fn new(end: NaiveDate) -> Self {
        Self { end }
    }

    fn rng_for(symbol: &str) -> StdRng {
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        StdRng::from_seed(seed)
    }

    /// Weekday dates ending on `self.end`, oldest first.
    fn session_dates(&self, sessions: usize) -> Vec<NaiveDate> {
        let mut dates = Vec::with_capacity(sessions);
        let mut current = self.end;
        while dates.len() < sessions {
            if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                dates.push(current);
            }
            current -= ChronoDuration::days(1);
        }
        dates.reverse();
        dates
    }

    pub fn generate(&self, symbol: &str, sessions: usize) -> Vec<Bar> {
        let mut rng = Self::rng_for(symbol);
        let contracting = rng.gen_range(0..3) == 0;
        let mut price: f64 = rng.gen_range(5.0..500.0);
        let base_volume: f64 = rng.gen_range(200_000.0..5_000_000.0);

        self.session_dates(sessions)
            .into_iter()
            .enumerate()
            .map(|(i, date)| {
                let progress = i as f64 / sessions.max(1) as f64;
                let (vol, volume_scale) = if contracting {
                    (0.03 * (1.0 - progress) + 0.003, 1.2 - 0.6 * progress)
                } else {
                    (0.02, 1.0)
                };

                let open = price;
                let close = (price * (1.0 + rng.gen_range(-vol..vol))).max(0.01);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..vol / 2.0));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..vol / 2.0));
                let volume = base_volume * volume_scale * rng.gen_range(0.8..1.2);
                price = close;

                Bar {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume: volume.round() as u64,
                }
            })
            .collect()
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        lookback: &Lookback,
        _timeout: Duration,
    ) -> Result<BarSeries, DataError> {
        let sessions = match lookback {
            Lookback::TradingDays(n) => *n as usize,
            Lookback::Range(_) => (lookback.calendar_days() as usize * 5) / 7,
        };
        let bars = self.generate(symbol, sessions);
        Ok(BarSeries::new(symbol, bars)?)
    }
}
