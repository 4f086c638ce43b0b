//! API route definitions.

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::detect::{Detection, PipelineError, PredictRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let pipeline = &state.pipeline;
    Json(json!({
        "data": {
            "status": if pipeline.is_ready() { "ok" } else { "degraded" },
            "model_loaded": pipeline.is_ready(),
            "model_error": pipeline.unavailable_reason(),
            "threshold": pipeline.threshold(),
            "sequence_length": pipeline.sequence_length(),
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339()
        }
    }))
}

pub(crate) async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Detection>, ApiError> {
    let pipeline = &state.pipeline;
    let request = match payload {
        Ok(Json(request)) => request,
        // A degraded service answers identically whatever the body looks like.
        Err(_) if !pipeline.is_ready() => return Err(PipelineError::ModelUnavailable.into()),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(PipelineError::BodyTooLarge.into())
        }
        Err(JsonRejection::BytesRejection(e)) => {
            return Err(PipelineError::UnreadableBody(e.body_text()).into())
        }
        Err(rejection) => return Err(PipelineError::MalformedBody(rejection.body_text()).into()),
    };
    let detection = pipeline.handle(request).await?;
    Ok(Json(detection))
}
