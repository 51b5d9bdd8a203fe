use ::analysis::abstract_data::abstract_classes::AnalysisToolKit;
use ::analysis::AnalysisMethods;
use polars::prelude::*;
use tracing::{debug, info};

use crate::predictor::analysis::api::{FeatureError, FeatureSettings, LOG_RETURNS_COLUMN};

/// Derives moving averages, log returns, lags and rolling volatility from a
/// price table, then keeps only the rows where every derived column is defined.
pub struct FeatureBuilder {
    settings: FeatureSettings,
    methods: AnalysisMethods,
}

impl FeatureBuilder {
    pub fn new(settings: FeatureSettings) -> Self {
        FeatureBuilder {
            settings,
            methods: AnalysisMethods {},
        }
    }

    /// Appends every derived column without dropping anything.
    pub fn derive_columns(&self, prices: &DataFrame) -> Result<DataFrame, FeatureError> {
        let price = prices
            .column(&self.settings.price_column)?
            .cast(&DataType::Float64)?;
        let price: Vec<Option<f64>> = price.f64()?.into_iter().collect();

        let mut engineered = prices.clone();
        for &window in &self.settings.moving_average_windows {
            let averages = self.methods.rolling_mean(&price, window)?;
            engineered.with_column(Series::new(
                &FeatureSettings::moving_average_column(window),
                averages,
            ))?;
        }

        let log_returns = self.methods.log_returns(&price);
        for lag in 1..=self.settings.lags {
            let lagged = self.methods.shift(&log_returns, lag);
            engineered.with_column(Series::new(&FeatureSettings::lag_column(lag), lagged))?;
        }
        for &window in &self.settings.volatility_windows {
            let volatility = self.methods.rolling_std(&log_returns, window)?;
            engineered.with_column(Series::new(
                &FeatureSettings::volatility_column(window),
                volatility,
            ))?;
        }
        engineered.with_column(Series::new(LOG_RETURNS_COLUMN, log_returns))?;

        let order = self.column_order(&engineered);
        Ok(engineered.select(order)?)
    }

    /// Derived columns with warm-up rows removed.
    pub fn build(&self, prices: &DataFrame) -> Result<DataFrame, FeatureError> {
        let engineered = self.derive_columns(prices)?;
        let cleaned = engineered.drop_nulls::<String>(None)?;
        info!(
            rows_in = prices.height(),
            rows_out = cleaned.height(),
            columns = cleaned.width(),
            "engineered features"
        );
        if cleaned.height() == 0 {
            return Err(FeatureError::NotEnoughRows {
                rows: prices.height(),
                warm_up: self.settings.warm_up_rows(),
            });
        }
        debug!("{}", cleaned.head(Some(5)));
        Ok(cleaned)
    }

    /// Input columns first, then moving averages, log returns, lags, volatilities.
    fn column_order(&self, engineered: &DataFrame) -> Vec<String> {
        let mut derived = self.settings.moving_average_columns();
        derived.push(LOG_RETURNS_COLUMN.to_string());
        derived.extend((1..=self.settings.lags).map(FeatureSettings::lag_column));
        derived.extend(self.settings.volatility_columns());

        let mut order: Vec<String> = engineered
            .get_column_names()
            .into_iter()
            .filter(|name| !derived.iter().any(|d| d == name))
            .map(str::to_string)
            .collect();
        order.extend(derived);
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn prices(n: usize) -> DataFrame {
        let adjusted: Vec<f64> = (0..n)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.1)
            .collect();
        df!(
            "timestamp" => (0..n as i64).map(|i| i * 86_400).collect::<Vec<i64>>(),
            "close" => adjusted.iter().map(|p| p + 0.5).collect::<Vec<f64>>(),
            "adjusted" => adjusted,
            "volume" => vec![1_000.0; n]
        )
        .expect("We should see a df")
    }

    fn small_settings() -> FeatureSettings {
        FeatureSettings {
            moving_average_windows: vec![3, 5],
            lags: 2,
            volatility_windows: vec![2, 4],
            ..FeatureSettings::default()
        }
    }

    fn column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name).unwrap().f64().unwrap().into_iter().collect()
    }

    #[test]
    fn default_columns_are_named_and_ordered() {
        let builder = FeatureBuilder::new(FeatureSettings::default());
        let engineered = builder.build(&prices(260)).unwrap();
        assert_eq!(
            engineered.get_column_names(),
            vec![
                "timestamp",
                "close",
                "adjusted",
                "volume",
                "ma_10",
                "ma_200",
                "log_returns",
                "lag1",
                "lag2",
                "lag3",
                "rolling_volatility_20",
                "rolling_volatility_50",
                "rolling_volatility_200",
            ]
        );
    }

    #[test]
    fn first_surviving_row_is_bounded_by_largest_window() {
        let builder = FeatureBuilder::new(FeatureSettings::default());
        let input = prices(260);
        let engineered = builder.build(&input).unwrap();
        assert_eq!(engineered.height(), 260 - 200);
        let first_timestamp = engineered.column("timestamp").unwrap().i64().unwrap().get(0);
        assert_eq!(first_timestamp, Some(200 * 86_400));
    }

    #[test]
    fn trimming_never_drops_complete_rows() {
        let builder = FeatureBuilder::new(small_settings());
        let input = prices(40);
        let derived = builder.derive_columns(&input).unwrap();
        let complete_rows = (0..derived.height())
            .filter(|&i| {
                derived
                    .get_columns()
                    .iter()
                    .all(|s| s.get(i).map_or(false, |v| !matches!(v, AnyValue::Null)))
            })
            .count();
        let engineered = builder.build(&input).unwrap();
        assert_eq!(engineered.height(), complete_rows);
        assert_eq!(engineered.height(), 40 - small_settings().warm_up_rows());
    }

    #[test]
    fn derived_values_match_their_definitions() {
        let builder = FeatureBuilder::new(small_settings());
        let input = prices(30);
        let derived = builder.derive_columns(&input).unwrap();
        let adjusted = column(&input, "adjusted");
        let ma_3 = column(&derived, "ma_3");
        let log_returns = column(&derived, "log_returns");
        let lag2 = column(&derived, "lag2");
        let vol_4 = column(&derived, "rolling_volatility_4");

        assert!(ma_3[..2].iter().all(Option::is_none));
        for t in 2..30 {
            let expected = (adjusted[t - 2].unwrap() + adjusted[t - 1].unwrap() + adjusted[t].unwrap()) / 3.0;
            assert_abs_diff_eq!(ma_3[t].unwrap(), expected, epsilon = 1e-10);
        }

        assert!(log_returns[0].is_none());
        for t in 1..30 {
            let ratio = adjusted[t].unwrap() / adjusted[t - 1].unwrap();
            assert_abs_diff_eq!(10f64.powf(log_returns[t].unwrap()), ratio, epsilon = 1e-10);
        }

        assert!(lag2[..3].iter().all(Option::is_none));
        assert_eq!(lag2[10], log_returns[8]);

        assert!(vol_4[..4].iter().all(Option::is_none));
        let window: Vec<f64> = log_returns[1..5].iter().map(|v| v.unwrap()).collect();
        let mean = window.iter().sum::<f64>() / 4.0;
        let std = (window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 3.0).sqrt();
        assert_abs_diff_eq!(vol_4[4].unwrap(), std, epsilon = 1e-12);
    }

    #[test]
    fn too_short_history_is_an_error() {
        let builder = FeatureBuilder::new(FeatureSettings::default());
        assert!(matches!(
            builder.build(&prices(150)),
            Err(FeatureError::NotEnoughRows { rows: 150, warm_up: 200 })
        ));
    }

    #[test]
    fn missing_price_column_is_an_error() {
        let builder = FeatureBuilder::new(FeatureSettings::default());
        let frame = df!("close" => &[1.0, 2.0]).unwrap();
        assert!(matches!(builder.build(&frame), Err(FeatureError::Polars(_))));
    }
}
