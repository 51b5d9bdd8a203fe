use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::form::{FormInputs, FormState, PredictorState, FORM_FIELDS, INPUT_STEP};
use crate::predictor::api::PredictionError;

pub type SharedState = Arc<PredictorState>;

/// Query string of the form page. Missing fields take their defaults once any
/// field is present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormQuery {
    pub ma_10: Option<f64>,
    pub ma_200: Option<f64>,
    pub rolling_volatility_20: Option<f64>,
    pub rolling_volatility_50: Option<f64>,
    pub rolling_volatility_200: Option<f64>,
}

impl FormQuery {
    fn values(&self) -> [Option<f64>; 5] {
        [
            self.ma_10,
            self.ma_200,
            self.rolling_volatility_20,
            self.rolling_volatility_50,
            self.rolling_volatility_200,
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.values().iter().all(Option::is_none)
    }

    pub fn into_inputs(self) -> FormInputs {
        let defaults = FormInputs::default().features();
        let mut features = defaults;
        for (slot, value) in features.iter_mut().zip(self.values()) {
            if let Some(value) = value {
                *slot = value;
            }
        }
        FormInputs::from_features(features)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: f64,
    pub text: String,
}

/// A failed computation fails only the request that triggered it.
#[derive(Debug)]
pub struct AppError(PredictionError);

impl From<PredictionError> for AppError {
    fn from(error: PredictionError) -> Self {
        AppError(error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "prediction request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

pub fn form_state(state: &PredictorState, query: FormQuery) -> Result<FormState, PredictionError> {
    if query.is_empty() {
        return Ok(FormState::Idle);
    }
    state.compute(query.into_inputs())
}

pub async fn index(
    State(state): State<SharedState>,
    Query(query): Query<FormQuery>,
) -> Result<Html<String>, AppError> {
    let form = form_state(&state, query)?;
    Ok(Html(render_page(&state, &form)))
}

pub async fn predict(
    State(state): State<SharedState>,
    Json(inputs): Json<FormInputs>,
) -> Result<Json<PredictResponse>, AppError> {
    let prediction = state.predict(&inputs)?;
    Ok(Json(PredictResponse {
        prediction,
        text: state.prediction_text(prediction),
    }))
}

pub async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/predict", post(predict))
        .route("/health", get(liveness))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render_page(state: &PredictorState, form: &FormState) -> String {
    let values = match form {
        FormState::Computed { inputs, .. } => inputs.features(),
        FormState::Idle => FormInputs::default().features(),
    };

    let fields: String = FORM_FIELDS
        .iter()
        .zip(values)
        .map(|(field, value)| {
            format!(
                r#"<label for="{name}">{label}</label>
<input type="number" id="{name}" name="{name}" value="{value}" step="{step}" onchange="this.form.submit()">
"#,
                name = field.name,
                label = field.label,
                value = value,
                step = INPUT_STEP,
            )
        })
        .collect();

    let output = match form {
        FormState::Computed { text, chart, .. } => {
            format!("<pre id=\"prediction\">📊 {}</pre>\n{}", escape_html(text), chart)
        }
        FormState::Idle => {
            "<pre id=\"prediction\">Enter values to compute a prediction.</pre>".to_string()
        }
    };

    let company = escape_html(&state.company);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{company} Stock Price Predictor</title>
<style>
body {{ font-family: sans-serif; margin: 1.5rem; }}
.layout {{ display: flex; gap: 2rem; }}
form {{ display: flex; flex-direction: column; gap: 0.4rem; min-width: 16rem; }}
pre {{ font-size: 1.1rem; }}
</style>
</head>
<body>
<h1>📈 {company} Stock Price Predictor</h1>
<div class="layout">
<form method="get" action="/">
{fields}<noscript><button type="submit">Predict</button></noscript>
</form>
<main>
{output}
</main>
</div>
</body>
</html>
"#
    )
}
