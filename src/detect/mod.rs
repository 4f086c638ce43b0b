//! Anomaly scoring pipeline: normalization, reconstruction scoring and the
//! orchestrator that ties extraction, normalization and scoring together.

pub mod input;
pub mod normalize;
pub mod pipeline;
pub mod scorer;

#[cfg(test)]
pub(crate) mod testing;

pub use self::input::{PipelineInput, PredictRequest};
pub use self::normalize::{normalize, NormalizedSequence, Truncation, PADDING_VALUE};
pub use self::pipeline::{Pipeline, Prepared};
pub use self::scorer::{ReconstructionScorer, ScoreError};

use crate::EventId;
use serde::Serialize;
use thiserror::Error;

/// Reconstruction error and the verdict derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub reconstruction_error: f64,
    pub is_anomaly: bool,
}

/// Successful pipeline outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub reconstruction_error: f64,
    pub is_anomaly: bool,
    /// Present only when the event IDs were extracted from log text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_sequence: Option<Vec<EventId>>,
}

/// Broad failure category, used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    UserInput,
    Unavailable,
    Internal,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Model is not loaded on the server")]
    ModelUnavailable,

    #[error("Request body must be a JSON object: {0}")]
    MalformedBody(String),

    #[error("Request body exceeds the configured size limit.")]
    BodyTooLarge,

    #[error("Request body could not be read: {0}")]
    UnreadableBody(String),

    #[error("Request must contain either 'log_text' or 'sequence'.")]
    MissingInput,

    #[error("Invalid 'log_text' format, must be a string.")]
    BadLogText,

    #[error("Invalid 'sequence' format, {0}.")]
    BadSequenceFormat(String),

    #[error("Could not find any valid Event IDs in the provided log text.")]
    NoEventIds,

    #[error("No sequence to process.")]
    EmptySequence,

    #[error("scoring failed: {0}")]
    Scoring(#[from] ScoreError),
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::ModelUnavailable => ErrorClass::Unavailable,
            PipelineError::Scoring(_) => ErrorClass::Internal,
            PipelineError::MalformedBody(_)
            | PipelineError::BodyTooLarge
            | PipelineError::UnreadableBody(_)
            | PipelineError::MissingInput
            | PipelineError::BadLogText
            | PipelineError::BadSequenceFormat(_)
            | PipelineError::NoEventIds
            | PipelineError::EmptySequence => ErrorClass::UserInput,
        }
    }
}
