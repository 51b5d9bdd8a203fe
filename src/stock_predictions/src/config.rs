use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, ValueEnum};

use crate::market_data::{
    lookback_window, CsvPriceSource, DataError, PriceSource, YahooFinance,
};
use crate::predictor::analysis::FeatureSettings;
use crate::predictor::api::PredictionSettings;

pub const DEFAULT_TICKER: &str = "GOOGL";
pub const DEFAULT_LOOKBACK_DAYS: i64 = 365 * 4;

/// Where daily prices come from.
#[derive(Debug, Clone, PartialEq, Args)]
pub struct SourceArgs {
    #[arg(long, env = "TICKER", default_value = DEFAULT_TICKER)]
    pub ticker: String,

    /// Days of history ending today.
    #[arg(long, env = "LOOKBACK_DAYS", default_value_t = DEFAULT_LOOKBACK_DAYS)]
    pub lookback_days: i64,

    /// Read prices from a CSV export instead of the network.
    #[arg(long, env = "PRICES_CSV")]
    pub csv: Option<PathBuf>,
}

impl Default for SourceArgs {
    fn default() -> Self {
        Self {
            ticker: DEFAULT_TICKER.to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            csv: None,
        }
    }
}

impl SourceArgs {
    pub fn open(&self) -> Result<Box<dyn PriceSource>, DataError> {
        match &self.csv {
            Some(path) => Ok(Box::new(CsvPriceSource::new(path))),
            None => Ok(Box::new(YahooFinance::new()?)),
        }
    }

    pub fn date_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        lookback_window(today, self.lookback_days)
    }
}

#[derive(Debug, Clone, PartialEq, Parser)]
#[command(name = "stock_report")]
#[command(about = "Engineer price features, fit a linear model and report its accuracy", long_about = None)]
pub struct ReportConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Share of rows held out for evaluation.
    #[arg(long, default_value_t = 0.2)]
    pub test_ratio: f64,

    #[arg(long, env = "SPLIT_SEED", default_value_t = 25)]
    pub seed: u64,

    /// Directory the SVG charts are written to.
    #[arg(long, env = "OUTPUT_DIR", default_value = "charts")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub show_correlations: bool,

    #[arg(long)]
    pub show_coefficients: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            source: SourceArgs::default(),
            test_ratio: 0.2,
            seed: 25,
            output_dir: PathBuf::from("charts"),
            show_correlations: false,
            show_coefficients: false,
        }
    }
}

impl ReportConfig {
    pub fn prediction_settings(&self, today: NaiveDate) -> PredictionSettings {
        let (start, end) = self.source.date_range(today);
        PredictionSettings {
            ticker: self.source.ticker.clone(),
            start,
            end,
            features: FeatureSettings::default(),
            test_ratio: self.test_ratio,
            seed: self.seed,
        }
    }
}

/// Data the form's model is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModelSource {
    /// 100 uniformly random rows.
    #[default]
    Synthetic,
    /// The training partition of the engineered price history.
    Market,
}

#[derive(Debug, Clone, PartialEq, Parser)]
#[command(name = "predictor_form")]
#[command(about = "Serve a form that predicts a price from five features", long_about = None)]
pub struct FormConfig {
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    #[arg(long, env = "MODEL_SOURCE", value_enum, default_value_t = ModelSource::Synthetic)]
    pub model_source: ModelSource,

    #[arg(long, env = "MODEL_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Name shown in the prediction text.
    #[arg(long, env = "COMPANY", default_value = "Google")]
    pub company: String,

    #[command(flatten)]
    pub source: SourceArgs,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            model_source: ModelSource::Synthetic,
            seed: 42,
            company: "Google".to_string(),
            source: SourceArgs::default(),
        }
    }
}

impl FormConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Settings used when the model is trained on market data.
    pub fn prediction_settings(&self, today: NaiveDate) -> PredictionSettings {
        let (start, end) = self.source.date_range(today);
        PredictionSettings {
            ticker: self.source.ticker.clone(),
            start,
            end,
            features: FeatureSettings::default(),
            test_ratio: 0.2,
            seed: self.seed,
        }
    }
}
