//! Expected header: `date,open,high,low,close,adjusted,volume` with ISO dates.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{info, warn};

use super::{check_range, date_to_timestamp, DataError, PriceBar, PriceSource};

#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    path: PathBuf,
}

impl CsvPriceSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read_frame(&self) -> Result<DataFrame, DataError> {
        let df = CsvReader::from_path(&self.path)?
            .has_header(true)
            .finish()?;
        Ok(df)
    }
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

impl PriceSource for CsvPriceSource {
    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError> {
        check_range(start, end)?;
        let df = self.read_frame()?;

        let dates = df.column("date")?.cast(&DataType::Utf8)?;
        let dates = dates.utf8()?;
        let open = float_column(&df, "open")?;
        let high = float_column(&df, "high")?;
        let low = float_column(&df, "low")?;
        let close = float_column(&df, "close")?;
        let volume = float_column(&df, "volume")?;
        // A file without the column is unadjusted throughout.
        let adjusted = if df.get_column_names().contains(&"adjusted") {
            float_column(&df, "adjusted")?
        } else {
            close.clone()
        };

        let mut bars = Vec::with_capacity(df.height());
        let mut skipped = 0usize;
        for (i, date) in dates.into_iter().enumerate() {
            let date = match date {
                Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .map_err(|e| DataError::InvalidDate(format!("{}: {}", raw, e)))?,
                None => {
                    skipped += 1;
                    continue;
                }
            };
            if date < start || date > end {
                continue;
            }
            let (Some(o), Some(h), Some(l), Some(c), Some(a), Some(v)) =
                (open[i], high[i], low[i], close[i], adjusted[i], volume[i])
            else {
                skipped += 1;
                continue;
            };
            bars.push(PriceBar {
                timestamp: date_to_timestamp(date),
                open: o,
                high: h,
                low: l,
                close: c,
                adjusted: a,
                volume: v,
            });
        }
        if skipped > 0 {
            warn!(ticker, skipped, "skipped csv rows with missing fields");
        }
        if bars.is_empty() {
            return Err(DataError::NoData {
                ticker: ticker.to_string(),
            });
        }
        bars.sort_by_key(|bar| bar.timestamp);
        info!(ticker, rows = bars.len(), path = %self.path.display(), "loaded daily bars from csv");
        Ok(bars)
    }
}
