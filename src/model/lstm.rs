//! LSTM autoencoder inference.
//!
//! The artifact is a JSON export of an embedding layer, an LSTM encoder whose
//! final state is repeated once per timestep, an LSTM decoder and a
//! single-output dense head applied to every decoder step. Gate blocks are
//! laid out input, forget, cell, output.

use crate::model::{ModelError, ReconstructionModel, ARTIFACT_FORMAT_VERSION};
use crate::EventId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

fn default_mask_zero() -> bool {
    true
}

/// Weights of one LSTM layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmWeights {
    pub kernel: Vec<Vec<f32>>,           // [input_dim][4 * units]
    pub recurrent_kernel: Vec<Vec<f32>>, // [units][4 * units]
    pub bias: Vec<f32>,                  // [4 * units]
}

/// Single-output dense head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseWeights {
    pub kernel: Vec<f32>, // [decoder units]
    pub bias: f32,
}

/// On-disk representation of the trained autoencoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoencoderArtifact {
    pub format_version: u32,
    pub timesteps: usize,
    #[serde(default = "default_mask_zero")]
    pub mask_zero: bool,
    pub embedding: Vec<Vec<f32>>, // [vocab][embedding_dim]
    pub encoder: LstmWeights,
    pub decoder: LstmWeights,
    pub dense: DenseWeights,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Shape overview of a loaded artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub format_version: u32,
    pub timesteps: usize,
    pub vocab_size: usize,
    pub embedding_dim: usize,
    pub encoder_units: usize,
    pub decoder_units: usize,
    pub mask_zero: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn all_finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

impl LstmWeights {
    pub fn units(&self) -> usize {
        self.bias.len() / 4
    }

    fn validate(&self, layer: &str, input_dim: usize) -> Result<(), ModelError> {
        let invalid = |msg: String| -> Result<(), ModelError> {
            Err(ModelError::InvalidArtifact(format!("{layer}: {msg}")))
        };

        if self.bias.is_empty() || self.bias.len() % 4 != 0 {
            return invalid(format!(
                "bias length {} is not a positive multiple of 4",
                self.bias.len()
            ));
        }
        let gates = self.bias.len();
        let units = self.units();

        if self.kernel.len() != input_dim {
            return invalid(format!(
                "kernel has {} rows, expected input dimension {}",
                self.kernel.len(),
                input_dim
            ));
        }
        if let Some(row) = self.kernel.iter().find(|r| r.len() != gates) {
            return invalid(format!("kernel row has {} columns, expected {}", row.len(), gates));
        }
        if self.recurrent_kernel.len() != units {
            return invalid(format!(
                "recurrent kernel has {} rows, expected {} units",
                self.recurrent_kernel.len(),
                units
            ));
        }
        if let Some(row) = self.recurrent_kernel.iter().find(|r| r.len() != gates) {
            return invalid(format!(
                "recurrent kernel row has {} columns, expected {}",
                row.len(),
                gates
            ));
        }
        let finite = all_finite(&self.bias)
            && self.kernel.iter().all(|r| all_finite(r))
            && self.recurrent_kernel.iter().all(|r| all_finite(r));
        if !finite {
            return invalid("non-finite weight".to_string());
        }
        Ok(())
    }

    /// Advance the cell by one timestep, updating `h` and `c` in place.
    fn step(&self, x: &[f32], h: &mut [f32], c: &mut [f32]) {
        let units = self.units();
        let mut z = self.bias.clone();

        for (xi, row) in x.iter().zip(&self.kernel) {
            if *xi == 0.0 {
                continue;
            }
            for (zj, w) in z.iter_mut().zip(row) {
                *zj += xi * w;
            }
        }
        for (hi, row) in h.iter().zip(&self.recurrent_kernel) {
            if *hi == 0.0 {
                continue;
            }
            for (zj, w) in z.iter_mut().zip(row) {
                *zj += hi * w;
            }
        }

        for k in 0..units {
            let input = sigmoid(z[k]);
            let forget = sigmoid(z[units + k]);
            let cell = z[2 * units + k].tanh();
            let output = sigmoid(z[3 * units + k]);
            c[k] = forget * c[k] + input * cell;
            h[k] = output * c[k].tanh();
        }
    }
}

impl DenseWeights {
    fn apply(&self, h: &[f32]) -> f32 {
        self.kernel.iter().zip(h).map(|(w, x)| w * x).sum::<f32>() + self.bias
    }
}

/// A validated, immutable LSTM autoencoder.
#[derive(Debug, Clone)]
pub struct LstmAutoencoder {
    artifact: AutoencoderArtifact,
    embedding_dim: usize,
}

impl LstmAutoencoder {
    /// Validate an artifact's shapes and wrap it for inference.
    pub fn from_artifact(artifact: AutoencoderArtifact) -> Result<Self, ModelError> {
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ModelError::UnsupportedFormat {
                found: artifact.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        if artifact.timesteps == 0 {
            return Err(ModelError::InvalidArtifact("timesteps must be positive".into()));
        }

        let embedding_dim = artifact.embedding.first().map(Vec::len).unwrap_or(0);
        if embedding_dim == 0 {
            return Err(ModelError::InvalidArtifact("embedding table is empty".into()));
        }
        if artifact.embedding.iter().any(|row| row.len() != embedding_dim) {
            return Err(ModelError::InvalidArtifact(
                "embedding rows have inconsistent widths".into(),
            ));
        }
        if !artifact.embedding.iter().all(|row| all_finite(row)) {
            return Err(ModelError::InvalidArtifact("embedding: non-finite weight".into()));
        }

        artifact.encoder.validate("encoder", embedding_dim)?;
        artifact.decoder.validate("decoder", artifact.encoder.units())?;

        if artifact.dense.kernel.len() != artifact.decoder.units() {
            return Err(ModelError::InvalidArtifact(format!(
                "dense: kernel has {} weights, expected {} decoder units",
                artifact.dense.kernel.len(),
                artifact.decoder.units()
            )));
        }
        if !all_finite(&artifact.dense.kernel) || !artifact.dense.bias.is_finite() {
            return Err(ModelError::InvalidArtifact("dense: non-finite weight".into()));
        }

        Ok(Self {
            artifact,
            embedding_dim,
        })
    }

    /// Read and validate the JSON artifact at `path`.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let shown = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: shown.clone(),
            source,
        })?;
        let artifact: AutoencoderArtifact =
            serde_json::from_str(&content).map_err(|source| ModelError::Parse {
                path: shown.clone(),
                source,
            })?;
        let model = Self::from_artifact(artifact)?;
        info!(
            path = %shown,
            timesteps = model.artifact.timesteps,
            vocab_size = model.vocab_size(),
            "loaded reconstruction model"
        );
        Ok(model)
    }

    pub fn vocab_size(&self) -> usize {
        self.artifact.embedding.len()
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            format_version: self.artifact.format_version,
            timesteps: self.artifact.timesteps,
            vocab_size: self.vocab_size(),
            embedding_dim: self.embedding_dim,
            encoder_units: self.artifact.encoder.units(),
            decoder_units: self.artifact.decoder.units(),
            mask_zero: self.artifact.mask_zero,
            metadata: self.artifact.metadata.clone(),
        }
    }

    fn reconstruct_row(&self, row: &[EventId]) -> Result<Vec<f32>, ModelError> {
        let timesteps = self.artifact.timesteps;
        if row.len() != timesteps {
            return Err(ModelError::InputShape {
                expected: timesteps,
                got: row.len(),
            });
        }

        // Encoder: padded positions are skipped and carry the state forward.
        let zeros = vec![0.0f32; self.embedding_dim];
        let enc_units = self.artifact.encoder.units();
        let mut h = vec![0.0f32; enc_units];
        let mut c = vec![0.0f32; enc_units];
        for &id in row {
            if self.artifact.mask_zero && id == 0 {
                continue;
            }
            let x = match self.artifact.embedding.get(id as usize) {
                Some(v) => v.as_slice(),
                None => {
                    warn!(
                        event_id = id,
                        vocab_size = self.vocab_size(),
                        "event id outside model vocabulary, embedding as zeros"
                    );
                    zeros.as_slice()
                }
            };
            self.artifact.encoder.step(x, &mut h, &mut c);
        }

        // Decoder: the encoded state is fed at every timestep.
        let dec_units = self.artifact.decoder.units();
        let mut h2 = vec![0.0f32; dec_units];
        let mut c2 = vec![0.0f32; dec_units];
        let mut out = Vec::with_capacity(timesteps);
        for t in 0..timesteps {
            self.artifact.decoder.step(&h, &mut h2, &mut c2);
            let y = self.artifact.dense.apply(&h2);
            if !y.is_finite() {
                return Err(ModelError::NonFinite(t));
            }
            out.push(y);
        }
        Ok(out)
    }
}

impl ReconstructionModel for LstmAutoencoder {
    fn timesteps(&self) -> usize {
        self.artifact.timesteps
    }

    fn reconstruct(&self, batch: &[Vec<EventId>]) -> Result<Vec<Vec<f32>>, ModelError> {
        batch.iter().map(|row| self.reconstruct_row(row)).collect()
    }
}
