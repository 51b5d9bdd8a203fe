pub mod csv;
pub mod yahoo;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use polars::prelude::*;
use thiserror::Error;

pub use self::csv::CsvPriceSource;
pub use self::yahoo::YahooFinance;

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const CLOSE_COLUMN: &str = "close";
pub const ADJUSTED_COLUMN: &str = "adjusted";
pub const VOLUME_COLUMN: &str = "volume";

#[derive(Error, Debug)]
pub enum DataError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("could not parse provider response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("provider error [{code}]: {description}")]
    Api { code: String, description: String },

    #[error("no price data returned for {ticker}")]
    NoData { ticker: String },

    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    /// Unix timestamp (seconds) of the session.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Close adjusted for dividends and splits.
    pub adjusted: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn date(&self) -> Option<NaiveDate> {
        timestamp_to_date(self.timestamp)
    }
}

pub fn timestamp_to_date(timestamp: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

pub fn date_to_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// `(end - days, end)`.
pub fn lookback_window(end: NaiveDate, days: i64) -> (NaiveDate, NaiveDate) {
    (end - Duration::days(days), end)
}

pub trait PriceSource {
    /// Daily bars for `ticker` with `start <= date <= end`, oldest first.
    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError>;
}

impl<S: PriceSource + ?Sized> PriceSource for Box<S> {
    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError> {
        (**self).fetch_daily(ticker, start, end)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPrices {
    pub bars: Vec<PriceBar>,
}

impl InMemoryPrices {
    pub fn new(bars: Vec<PriceBar>) -> Self {
        Self { bars }
    }
}

impl PriceSource for InMemoryPrices {
    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError> {
        check_range(start, end)?;
        let bars: Vec<PriceBar> = self
            .bars
            .iter()
            .filter(|bar| bar.date().map_or(false, |d| d >= start && d <= end))
            .cloned()
            .collect();
        if bars.is_empty() {
            return Err(DataError::NoData {
                ticker: ticker.to_string(),
            });
        }
        Ok(bars)
    }
}

pub(crate) fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), DataError> {
    if start > end {
        return Err(DataError::InvalidDateRange { start, end });
    }
    Ok(())
}

/// Builds the price table used for feature engineering. Open, high and low are
/// not carried over; rows are ordered by timestamp.
pub fn price_table(bars: &[PriceBar]) -> Result<DataFrame, DataError> {
    let mut sorted: Vec<&PriceBar> = bars.iter().collect();
    sorted.sort_by_key(|bar| bar.timestamp);

    let df = DataFrame::new(vec![
        Series::new(
            TIMESTAMP_COLUMN,
            sorted.iter().map(|b| b.timestamp).collect::<Vec<i64>>(),
        ),
        Series::new(
            CLOSE_COLUMN,
            sorted.iter().map(|b| b.close).collect::<Vec<f64>>(),
        ),
        Series::new(
            ADJUSTED_COLUMN,
            sorted.iter().map(|b| b.adjusted).collect::<Vec<f64>>(),
        ),
        Series::new(
            VOLUME_COLUMN,
            sorted.iter().map(|b| b.volume).collect::<Vec<f64>>(),
        ),
    ])?;
    Ok(df)
}
