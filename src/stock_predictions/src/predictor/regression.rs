use ::analysis::abstract_data::abstract_classes::AnalysisToolKit;
use ::analysis::{AnalysisMethods, NDArrayHelper, RegressionMetrics, TrainTestSplit};
use polars::prelude::*;
use tracing::info;

use crate::market_data::{price_table, PriceSource, TIMESTAMP_COLUMN};
use crate::predictor::analysis::FeatureBuilder;
use crate::predictor::api::{Evaluation, PredictionError, PredictionSettings, Predictor};

/// Fits adjusted close on moving averages and rolling volatility.
pub struct RegressionPredictor<S: PriceSource> {
    source: S,
    pub settings: PredictionSettings,
    methods: AnalysisMethods,
}

impl<S: PriceSource> RegressionPredictor<S> {
    pub fn new(source: S, settings: PredictionSettings) -> Self {
        RegressionPredictor {
            source,
            settings,
            methods: AnalysisMethods {},
        }
    }
}

impl<S: PriceSource> Predictor for RegressionPredictor<S> {
    fn retrieve_formatted_data(&self) -> Result<DataFrame, PredictionError> {
        let settings = &self.settings;
        let bars = self
            .source
            .fetch_daily(&settings.ticker, settings.start, settings.end)?;
        info!(ticker = %settings.ticker, bars = bars.len(), "retrieved daily bars");
        Ok(price_table(&bars)?)
    }

    fn build_prediction_data(&self, cleaned_data: DataFrame) -> Result<DataFrame, PredictionError> {
        let builder = FeatureBuilder::new(self.settings.features.clone());
        Ok(builder.build(&cleaned_data)?)
    }

    fn create_predictions(&self, prediction_data: &DataFrame) -> Result<Evaluation, PredictionError> {
        let helper = NDArrayHelper {};
        let feature_names = self.settings.features.model_features();
        let x = helper.dataframe_to_matrix(prediction_data, &feature_names)?;
        let y = helper.column_to_vector(prediction_data, &self.settings.features.price_column)?;
        let timestamps: Vec<i64> = prediction_data
            .column(TIMESTAMP_COLUMN)?
            .i64()?
            .into_iter()
            .map(|ts| ts.unwrap_or_default())
            .collect();

        let split = TrainTestSplit::new(x.nrows(), self.settings.test_ratio, self.settings.seed)?;
        let train_features = split.train_rows(&x);
        let train_targets = split.train_values(&y);
        let test_features = split.test_rows(&x);
        let actual = split.test_values(&y);

        let model = self
            .methods
            .fit_regression(&train_features, &train_targets, feature_names)?;
        let predicted = self.methods.create_predictions(&model, &test_features)?;
        let metrics = RegressionMetrics::calculate(&actual, &predicted)?;
        info!(
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            r2 = metrics.r2,
            rmse = metrics.rmse,
            "evaluated linear model on held-out rows"
        );

        let test_timestamps = split.test.iter().map(|&i| timestamps[i]).collect();
        Ok(Evaluation {
            model,
            metrics,
            split,
            train_features,
            train_targets,
            test_timestamps,
            actual,
            predicted,
        })
    }
}
