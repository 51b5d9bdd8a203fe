use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use tracing::{info, warn};

use super::{check_range, date_to_timestamp, DataError, PriceBar, PriceSource};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct YahooFinance {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl YahooFinance {
    pub fn new() -> Result<Self, DataError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// `end` is inclusive, so the upper bound is midnight of the following day.
    fn build_url(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let period1 = date_to_timestamp(start);
        let period2 = date_to_timestamp(end + Duration::days(1));
        format!(
            "{}/{}?period1={}&period2={}&interval=1d&events=history",
            self.base_url, ticker, period1, period2
        )
    }

    fn parse_response(&self, ticker: &str, json: &str) -> Result<Vec<PriceBar>, DataError> {
        let response: YahooResponse = serde_json::from_str(json)?;

        if let Some(error) = response.chart.error {
            return Err(DataError::Api {
                code: error.code,
                description: error.description,
            });
        }

        let no_data = || DataError::NoData {
            ticker: ticker.to_string(),
        };
        let results = response.chart.result.ok_or_else(no_data)?;
        let data = results.first().ok_or_else(no_data)?;
        let quote = data.indicators.quote.first().ok_or_else(no_data)?;
        let adjusted = data.indicators.adjclose.as_ref().and_then(|a| a.first());

        let mut bars = Vec::with_capacity(data.timestamp.len());
        let mut skipped = 0usize;
        for (i, &timestamp) in data.timestamp.iter().enumerate() {
            let field = |values: &Vec<Option<f64>>| values.get(i).copied().flatten();
            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
                field(&quote.open),
                field(&quote.high),
                field(&quote.low),
                field(&quote.close),
                field(&quote.volume),
            ) else {
                skipped += 1;
                continue;
            };
            // Only a response without any adjusted series uses the close throughout.
            let adjusted = match adjusted {
                Some(series) => match field(&series.adjclose) {
                    Some(value) => value,
                    None => {
                        skipped += 1;
                        continue;
                    }
                },
                None => close,
            };
            bars.push(PriceBar {
                timestamp,
                open,
                high,
                low,
                close,
                adjusted,
                volume,
            });
        }
        if skipped > 0 {
            warn!(ticker, skipped, "skipped bars with missing fields");
        }

        if bars.is_empty() {
            return Err(no_data());
        }
        Ok(bars)
    }
}

impl PriceSource for YahooFinance {
    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError> {
        check_range(start, end)?;
        let url = self.build_url(ticker, start, end);
        info!(ticker, %start, %end, "requesting daily bars");
        let text = self.client.get(&url).send()?.error_for_status()?.text()?;
        self.parse_response(ticker, &text)
    }
}
