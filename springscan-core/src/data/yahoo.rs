//! Yahoo Finance data provider.
//!
//! Fetches daily OHLCV bars from Yahoo's v8 chart API. One `fetch` call is one
//! HTTP request; retries are the caller's business. The shared circuit breaker
//! refuses requests after a ban or repeated failures.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataProvider, Lookback};
use crate::domain::{Bar, BarSeries};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const CHART_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
        })
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }

    /// Build the chart API URL for a symbol.
    ///
    /// Trading-day lookbacks become an explicit `period1..period2` window wide
    /// enough to hold the requested sessions; ranges are passed through.
    fn chart_url(symbol: &str, lookback: &Lookback, now: DateTime<Utc>) -> String {
        match lookback {
            Lookback::TradingDays(_) => {
                let start = now - ChronoDuration::days(lookback.calendar_days());
                format!(
                    "{CHART_BASE_URL}/{symbol}?period1={}&period2={}&interval=1d",
                    start.timestamp(),
                    now.timestamp()
                )
            }
            Lookback::Range(range) => {
                format!("{CHART_BASE_URL}/{symbol}?range={range}&interval=1d")
            }
        }
    }

    /// Parse the chart API response into bars, oldest first as Yahoo sends them.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // A symbol with no trading history in the window comes back without timestamps.
        let Some(timestamps) = data.timestamp else {
            return Err(DataError::EmptySeries {
                symbol: symbol.to_string(),
            });
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut bars = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Holidays and halted sessions arrive as all-null rows.
            if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
                continue;
            }

            bars.push(Bar {
                date,
                open: open.unwrap_or(f64::NAN),
                high: high.unwrap_or(f64::NAN),
                low: low.unwrap_or(f64::NAN),
                close: close.unwrap_or(f64::NAN),
                volume: volume.unwrap_or(0),
            });
        }

        if bars.is_empty() {
            return Err(DataError::EmptySeries {
                symbol: symbol.to_string(),
            });
        }

        Ok(bars)
    }

    /// Feed one request's result to the breaker.
    ///
    /// Only rate limiting and HTTP error statuses count as failures. Timeouts,
    /// transport errors and unknown symbols leave the failure count alone.
    fn record_outcome(&self, result: &Result<Vec<Bar>, DataError>) {
        match result {
            Ok(_) => self.circuit_breaker.record_success(),
            Err(DataError::RateLimited { .. } | DataError::Other(_)) => {
                self.circuit_breaker.record_failure()
            }
            Err(_) => {}
        }
    }

    fn request(
        &self,
        symbol: &str,
        lookback: &Lookback,
        timeout: Duration,
    ) -> Result<Vec<Bar>, DataError> {
        let url = Self::chart_url(symbol, lookback, Utc::now());
        tracing::debug!(%symbol, %url, "requesting chart");

        let resp = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    DataError::Timeout(timeout)
                } else {
                    DataError::NetworkUnreachable(e.to_string())
                }
            })?;

        let status = resp.status();

        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerTripped);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            if e.is_timeout() {
                DataError::Timeout(timeout)
            } else {
                DataError::ResponseFormatChanged(format!(
                    "failed to parse response for {symbol}: {e}"
                ))
            }
        })?;

        Self::parse_response(symbol, chart)
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        lookback: &Lookback,
        timeout: Duration,
    ) -> Result<BarSeries, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let bars = self.request(symbol, lookback, timeout);
        self.record_outcome(&bars);
        let mut series = BarSeries::new(symbol, bars?)?;
        if let Lookback::TradingDays(n) = lookback {
            series.truncate_front(*n as usize);
        }
        Ok(series)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
