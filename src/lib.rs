//! EventSentry -- anomaly detection over Windows event ID sequences.
//!
//! This crate provides event-ID extraction from log text, fixed-length
//! normalization, LSTM-autoencoder reconstruction scoring, and the HTTP
//! service that exposes the pipeline.

pub mod api;
pub mod config;
pub mod detect;
pub mod extract;
pub mod model;

use crate::config::Config;
use crate::detect::{Pipeline, ReconstructionScorer};
use crate::extract::{EventExtractor, TimestampedLineExtractor};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

/// Categorical event-type code. `0` is reserved for padding.
pub type EventId = u32;

/// Build the scoring pipeline from configuration.
///
/// A model that fails to load yields a degraded pipeline, unless
/// `model.require_on_startup` is set, in which case the error is returned.
pub fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let extractor: Arc<dyn EventExtractor> = Arc::new(TimestampedLineExtractor::new());
    let path = &config.model.path;

    match model::load_artifact(path, config.model.expected_sequence_length) {
        Ok(model) => {
            let scorer = ReconstructionScorer::new(
                Arc::new(model),
                config.detection.threshold,
                config.model.inference_timeout(),
            );
            info!(
                path = %path.display(),
                sequence_length = scorer.sequence_length(),
                threshold = scorer.threshold(),
                "scoring pipeline ready"
            );
            Ok(Pipeline::ready(extractor, scorer, config.model.truncation))
        }
        Err(e) if config.model.require_on_startup => Err(e)
            .with_context(|| format!("required model artifact {} could not be loaded", path.display())),
        Err(e) => {
            error!(
                path = %path.display(),
                error = %e,
                "model failed to load, serving in degraded mode"
            );
            Ok(Pipeline::degraded(
                extractor,
                "model artifact failed to load",
                config.detection.threshold,
            ))
        }
    }
}

/// Start the EventSentry HTTP service and run until Ctrl-C.
pub async fn serve(config: Config) -> Result<()> {
    let pipeline = build_pipeline(&config)?;
    let state = api::state::AppState::new(pipeline).with_body_limit(config.server.max_body_bytes);
    let app = api::router(state);

    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.server.bind))?;

    tracing::info!(%addr, "EventSentry listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    Ok(())
}
