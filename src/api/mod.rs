//! API layer -- axum routes, handlers, and error mapping.

mod routes;
pub mod state;

use self::state::AppState;
use crate::detect::{ErrorClass, PipelineError};
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

/// Build the application router with all API routes.
///
/// `POST /predict` is kept alongside `/api/v1/predict` for existing clients.
pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .route("/predict", post(routes::predict))
        .fallback(fallback)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

/// A pipeline failure rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0.class() {
            ErrorClass::UserInput => {
                debug!(error = %self.0, "rejected prediction request");
                let status = match &self.0 {
                    PipelineError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, self.0.to_string())
            }
            ErrorClass::Unavailable => {
                warn!(error = %self.0, "prediction requested while model unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string())
            }
            ErrorClass::Internal => {
                let reference = uuid::Uuid::new_v4();
                error!(%reference, error = %self.0, "prediction failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("An internal error occurred (ref {reference})"),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
