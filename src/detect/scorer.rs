//! Reconstruction-error scoring against a shared model.

use crate::detect::normalize::NormalizedSequence;
use crate::detect::Score;
use crate::model::{ModelError, ReconstructionModel};
use crate::EventId;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("inference did not finish within {0:?}")]
    Timeout(Duration),

    #[error("inference worker failed: {0}")]
    Worker(String),
}

/// `true` exactly when the error is strictly above the threshold.
pub fn is_anomalous(error: f64, threshold: f64) -> bool {
    error > threshold
}

/// Mean of the squared per-timestep differences.
pub fn mean_squared_error(input: &[EventId], reconstruction: &[f32]) -> f64 {
    if input.is_empty() {
        return 0.0;
    }
    let sum: f64 = input
        .iter()
        .zip(reconstruction)
        .map(|(&x, &y)| (x as f64 - y as f64).powi(2))
        .sum();
    sum / input.len() as f64
}

/// Scores normalized sequences with one immutable model and threshold.
#[derive(Clone)]
pub struct ReconstructionScorer {
    model: Arc<dyn ReconstructionModel>,
    threshold: f64,
    timeout: Duration,
}

impl std::fmt::Debug for ReconstructionScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconstructionScorer")
            .field("sequence_length", &self.sequence_length())
            .field("threshold", &self.threshold)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ReconstructionScorer {
    pub fn new(model: Arc<dyn ReconstructionModel>, threshold: f64, timeout: Duration) -> Self {
        Self {
            model,
            threshold,
            timeout,
        }
    }

    /// The L every input must be normalized to, as declared by the model.
    pub fn sequence_length(&self) -> usize {
        self.model.timesteps()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score on the current thread.
    pub fn score_blocking(&self, input: &NormalizedSequence) -> Result<Score, ModelError> {
        score_with(self.model.as_ref(), self.threshold, input)
    }

    /// Score on the blocking pool, bounded by the configured timeout.
    pub async fn score(&self, input: NormalizedSequence) -> Result<Score, ScoreError> {
        let model = Arc::clone(&self.model);
        let threshold = self.threshold;
        let task =
            tokio::task::spawn_blocking(move || score_with(model.as_ref(), threshold, &input));

        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => Err(ScoreError::Timeout(self.timeout)),
            Ok(Err(join)) => Err(ScoreError::Worker(join.to_string())),
            Ok(Ok(result)) => result.map_err(ScoreError::Model),
        }
    }
}

fn score_with(
    model: &dyn ReconstructionModel,
    threshold: f64,
    input: &NormalizedSequence,
) -> Result<Score, ModelError> {
    let expected = model.timesteps();
    if input.len() != expected {
        return Err(ModelError::InputShape {
            expected,
            got: input.len(),
        });
    }

    let batch = vec![input.as_slice().to_vec()];
    let reconstruction = model
        .reconstruct(&batch)?
        .into_iter()
        .next()
        .ok_or(ModelError::OutputShape { expected, got: 0 })?;
    if reconstruction.len() != expected {
        return Err(ModelError::OutputShape {
            expected,
            got: reconstruction.len(),
        });
    }
    if let Some(t) = reconstruction.iter().position(|v| !v.is_finite()) {
        return Err(ModelError::NonFinite(t));
    }

    let error = mean_squared_error(input.as_slice(), &reconstruction);
    let score = Score {
        reconstruction_error: error,
        is_anomaly: is_anomalous(error, threshold),
    };
    debug!(error, threshold, is_anomaly = score.is_anomaly, "scored sequence");
    Ok(score)
}
