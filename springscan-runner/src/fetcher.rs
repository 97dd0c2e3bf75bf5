//! History fetcher: one symbol's bars with bounded retry.
//!
//! Providers make a single attempt per call. The fetcher owns the retry loop:
//! up to `max_attempts` calls, `retry_delay` between a failed attempt and the
//! next, and no sleep after the last one. Exhaustion is reported as a value,
//! never as a panic. With a shared `RateLimit`, every attempt (retries
//! included) waits for a token before calling the provider.

use crate::config::FetchPolicy;
use crate::pacing::RateLimit;
use serde::{Deserialize, Serialize};
use springscan_core::data::{DataError, DataProvider};
use springscan_core::domain::BarSeries;
use std::thread;
use tracing::{debug, warn};

/// A symbol that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub symbol: String,
    /// Attempts actually made (0 if the symbol was never tried).
    pub attempts: u32,
    pub last_error: String,
}

impl FetchFailure {
    pub(crate) fn new(symbol: &str, attempts: u32, error: &DataError) -> Self {
        Self {
            symbol: symbol.to_string(),
            attempts,
            last_error: error.to_string(),
        }
    }
}

pub struct HistoryFetcher<'a> {
    provider: &'a dyn DataProvider,
    policy: FetchPolicy,
}

impl<'a> HistoryFetcher<'a> {
    pub fn new(provider: &'a dyn DataProvider, policy: FetchPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub fn provider(&self) -> &'a dyn DataProvider {
        self.provider
    }

    /// Fetch `symbol`, retrying per the policy. The series is returned exactly
    /// as the provider supplied it.
    pub fn fetch(&self, symbol: &str) -> Result<BarSeries, FetchFailure> {
        self.fetch_paced(symbol, None)
    }

    /// Like `fetch`, but each provider call first takes a token from `limiter`.
    pub fn fetch_paced(
        &self,
        symbol: &str,
        limiter: Option<&RateLimit>,
    ) -> Result<BarSeries, FetchFailure> {
        let max_attempts = self.policy.max_attempts.max(1);
        let timeout = self.policy.attempt_timeout();
        let mut attempt = 0;

        loop {
            attempt += 1;
            if let Some(limiter) = limiter {
                limiter.acquire();
            }
            let error = match self.provider.fetch(symbol, &self.policy.lookback, timeout) {
                Ok(series) if !series.is_empty() => return Ok(series),
                Ok(_) => DataError::EmptySeries {
                    symbol: symbol.to_string(),
                },
                Err(e) => e,
            };

            debug!(
                symbol,
                attempt,
                max_attempts,
                provider = self.provider.name(),
                error = %error,
                "fetch attempt failed"
            );

            if attempt >= max_attempts || matches!(error, DataError::CircuitBreakerTripped) {
                warn!(symbol, attempts = attempt, error = %error, "giving up on symbol");
                return Err(FetchFailure::new(symbol, attempt, &error));
            }
            thread::sleep(self.policy.retry_delay());
        }
    }
}
