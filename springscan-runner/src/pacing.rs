//! Request pacing.
//!
//! Sequential scans follow a fixed schedule: a short pause after every symbol
//! and a longer one after every `batch_size`-th. Parallel scans share a token
//! bucket whose period is the schedule's average spacing, so the request rate
//! seen by the provider is the same either way.

use crate::config::PacingConfig;
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::thread;
use std::time::Duration;

/// Fixed pause schedule for sequential scans.
#[derive(Debug, Clone)]
pub struct PauseSchedule {
    symbol_pause: Duration,
    batch_pause: Duration,
    batch_size: usize,
}

impl PauseSchedule {
    pub fn new(config: &PacingConfig) -> Self {
        Self {
            symbol_pause: config.symbol_pause(),
            batch_pause: config.batch_pause(),
            batch_size: config.batch_size.max(1),
        }
    }

    /// Pause owed after `processed` symbols (1-based count).
    pub fn pause_after(&self, processed: usize) -> Duration {
        if processed > 0 && processed % self.batch_size == 0 {
            self.batch_pause
        } else {
            self.symbol_pause
        }
    }

    /// Average spacing between symbols over one batch.
    pub fn mean_interval(&self) -> Duration {
        // Past u32::MAX the batch pause no longer moves the mean.
        let batch_size = u32::try_from(self.batch_size).unwrap_or(u32::MAX);
        let per_batch = self.symbol_pause * (batch_size - 1) + self.batch_pause;
        per_batch / batch_size
    }

    pub fn wait_after(&self, processed: usize) {
        let pause = self.pause_after(processed);
        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }
}

const MIN_WAIT: Duration = Duration::from_micros(200);

/// Token bucket shared by parallel workers (burst of one).
pub struct RateLimit {
    limiter: DefaultDirectRateLimiter,
    clock: DefaultClock,
    period: Duration,
}

impl RateLimit {
    /// `None` when the period is zero: nothing to limit.
    pub fn with_period(period: Duration) -> Option<Self> {
        let quota = Quota::with_period(period)?.allow_burst(NonZeroU32::MIN);
        Some(Self {
            limiter: RateLimiter::direct(quota),
            clock: DefaultClock::default(),
            period,
        })
    }

    /// Limiter matching the average rate of the sequential schedule.
    pub fn for_schedule(schedule: &PauseSchedule) -> Option<Self> {
        Self::with_period(schedule.mean_interval())
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Block until a request may go out.
    pub fn acquire(&self) {
        while let Err(not_until) = self.limiter.check() {
            // Capped at one period; the loop re-checks anyway.
            let wait = not_until.wait_time_from(self.clock.now()).min(self.period);
            thread::sleep(wait.max(MIN_WAIT));
        }
    }
}

impl std::fmt::Debug for RateLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimit").field("period", &self.period).finish()
    }
}
