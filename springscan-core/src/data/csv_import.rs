//! CSV directory provider.
//!
//! Reads `<dir>/<SYMBOL>.csv` with a `date,open,high,low,close,volume` header.
//! Rows must already be in chronological order; the provider keeps the
//! trailing sessions a trading-day lookback asks for.

use super::provider::{DataError, DataProvider, Lookback};
use crate::domain::{Bar, BarSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume")]
    volume: f64,
}

#[derive(Debug, Clone)]
pub struct CsvDirProvider {
    dir: PathBuf,
}

impl CsvDirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    fn read_bars(path: &Path) -> Result<Vec<Bar>, DataError> {
        let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
        let mut bars = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(csv_error)?;
            bars.push(Bar {
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume.max(0.0).round() as u64,
            });
        }
        Ok(bars)
    }
}

fn csv_error(e: csv::Error) -> DataError {
    if e.is_io_error() {
        match e.into_kind() {
            csv::ErrorKind::Io(io) => DataError::Io(io),
            other => DataError::Other(format!("{other:?}")),
        }
    } else {
        DataError::ResponseFormatChanged(e.to_string())
    }
}

impl DataProvider for CsvDirProvider {
    fn name(&self) -> &str {
        "csv_dir"
    }

    fn fetch(
        &self,
        symbol: &str,
        lookback: &Lookback,
        _timeout: Duration,
    ) -> Result<BarSeries, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let bars = Self::read_bars(&path)?;
        if bars.is_empty() {
            return Err(DataError::EmptySeries {
                symbol: symbol.to_string(),
            });
        }

        let mut series = BarSeries::new(symbol, bars)?;
        if let Lookback::TradingDays(n) = lookback {
            series.truncate_front(*n as usize);
        }
        Ok(series)
    }
}
