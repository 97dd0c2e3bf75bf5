//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over history sources (Yahoo Finance, a CSV
//! directory, synthetic walks) so the scanner can swap implementations and
//! tests can mock the network away.

use crate::domain::{BarError, BarSeries};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Structured error types for data operations.
///
/// The scanner only distinguishes "fetched" from "not fetched"; the variants
/// exist for logs and for the CLI.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider returned no bars for {symbol}")]
    EmptySeries { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("validation error: {0}")]
    Validation(#[from] BarError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// How much history to request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Lookback {
    /// The trailing `n` trading sessions.
    TradingDays(u32),
    /// A provider-native range token such as `3mo` or `1y`.
    Range(String),
}

impl Default for Lookback {
    fn default() -> Self {
        Lookback::TradingDays(60)
    }
}

impl Lookback {
    /// Approximate calendar days covered, used to size request windows.
    ///
    /// Trading days are padded for weekends plus a holiday margin.
    pub fn calendar_days(&self) -> i64 {
        match self {
            Lookback::TradingDays(n) => (*n as i64 * 7 + 4) / 5 + 10,
            Lookback::Range(token) => {
                let (num, unit) = split_range_token(token).unwrap_or((1, "y"));
                let num = num as i64;
                match unit {
                    "d" => num,
                    "wk" => num * 7,
                    "mo" => num * 31,
                    _ => num * 366,
                }
            }
        }
    }
}

const RANGE_UNITS: [&str; 4] = ["d", "wk", "mo", "y"];

fn split_range_token(token: &str) -> Option<(u32, &str)> {
    let split = token.find(|c: char| !c.is_ascii_digit())?;
    let (num, unit) = token.split_at(split);
    let num: u32 = num.parse().ok()?;
    if num == 0 || !RANGE_UNITS.contains(&unit) {
        return None;
    }
    Some((num, unit))
}

impl FromStr for Lookback {
    type Err = String;

    /// `60` or `60d` are trading days; `2wk`, `3mo`, `1y` are ranges.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u32>() {
            if n == 0 {
                return Err("lookback must be at least one day".into());
            }
            return Ok(Lookback::TradingDays(n));
        }
        match split_range_token(s) {
            Some((n, "d")) => Ok(Lookback::TradingDays(n)),
            Some(_) => Ok(Lookback::Range(s.to_string())),
            None => Err(format!(
                "invalid lookback '{s}' (expected e.g. 60, 60d, 3mo, 1y)"
            )),
        }
    }
}

impl TryFrom<String> for Lookback {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Lookback> for String {
    fn from(value: Lookback) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookback::TradingDays(n) => write!(f, "{n}d"),
            Lookback::Range(token) => f.write_str(token),
        }
    }
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
}

/// Trait for history providers.
///
/// One call is one attempt: retrying belongs to the caller. Implementations
/// must give up after `timeout` and report `DataError::Timeout` (or another
/// error) rather than block indefinitely.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the bar history for a symbol.
    fn fetch(
        &self,
        symbol: &str,
        lookback: &Lookback,
        timeout: Duration,
    ) -> Result<BarSeries, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

impl<P: DataProvider + ?Sized> DataProvider for &P {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        symbol: &str,
        lookback: &Lookback,
        timeout: Duration,
    ) -> Result<BarSeries, DataError> {
        (**self).fetch(symbol, lookback, timeout)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

impl<P: DataProvider + ?Sized> DataProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        symbol: &str,
        lookback: &Lookback,
        timeout: Duration,
    ) -> Result<BarSeries, DataError> {
        (**self).fetch(symbol, lookback, timeout)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
