//! Reconstruction models -- the trait the scorer drives and the concrete
//! LSTM autoencoder artifact.

pub mod lstm;

pub use self::lstm::{ArtifactSummary, LstmAutoencoder};

use crate::EventId;
use std::path::Path;
use thiserror::Error;

/// Artifact format understood by this build.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model artifact {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported artifact format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },

    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("sequence length mismatch: artifact declares {artifact} timesteps, configuration expects {configured}")]
    SequenceLengthMismatch { artifact: usize, configured: usize },

    #[error("input shape mismatch: expected {expected} timesteps, got {got}")]
    InputShape { expected: usize, got: usize },

    #[error("output shape mismatch: expected {expected} values, got {got}")]
    OutputShape { expected: usize, got: usize },

    #[error("non-finite value in reconstruction at timestep {0}")]
    NonFinite(usize),
}

/// A learned sequence reconstruction function.
///
/// Implementations are immutable after construction and must be safe to call
/// from many threads at once; the scorer shares a single instance across all
/// requests.
pub trait ReconstructionModel: Send + Sync {
    /// Fixed number of timesteps every input row must have.
    fn timesteps(&self) -> usize;

    /// Reconstruct a batch of fixed-length rows. The output has one row per
    /// input row and one scalar per timestep.
    fn reconstruct(&self, batch: &[Vec<EventId>]) -> Result<Vec<Vec<f32>>, ModelError>;
}

/// Load the LSTM autoencoder artifact at `path`.
///
/// When `expected_timesteps` is set, an artifact declaring a different
/// sequence length is rejected instead of being served with mismatched
/// padding.
pub fn load_artifact(
    path: &Path,
    expected_timesteps: Option<usize>,
) -> Result<LstmAutoencoder, ModelError> {
    let model = LstmAutoencoder::load(path)?;
    if let Some(configured) = expected_timesteps {
        if configured != model.timesteps() {
            return Err(ModelError::SequenceLengthMismatch {
                artifact: model.timesteps(),
                configured,
            });
        }
    }
    Ok(model)
}
