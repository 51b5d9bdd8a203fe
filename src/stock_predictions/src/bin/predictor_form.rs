use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stock_predictions::config::{FormConfig, ModelSource};
use stock_predictions::form::{router, PredictorState};
use stock_predictions::predictor::regression::RegressionPredictor;
use stock_predictions::StockPredictor;

fn train(config: &FormConfig) -> Result<PredictorState> {
    match config.model_source {
        ModelSource::Synthetic => Ok(PredictorState::synthetic(config.seed, &config.company)?),
        ModelSource::Market => {
            let settings = config.prediction_settings(Local::now().date_naive());
            let source = config.source.open().context("opening price source")?;
            let run = StockPredictor::new(RegressionPredictor::new(source, settings))
                .update_predictions()
                .context("training the form model on market data")?;
            Ok(PredictorState::from_evaluation(run.evaluation, &config.company)?)
        }
    }
}

async fn serve(config: FormConfig, state: PredictorState) -> Result<()> {
    let addr = config.socket_addr().context("parsing listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "prediction form listening");
    axum::serve(listener, router(Arc::new(state)))
        .await
        .context("serving the prediction form")?;
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = FormConfig::parse();
    // Training may use the blocking HTTP client, so it runs before the runtime exists.
    let state = train(&config)?;
    tokio::runtime::Runtime::new()
        .context("starting the tokio runtime")?
        .block_on(serve(config, state))
}
