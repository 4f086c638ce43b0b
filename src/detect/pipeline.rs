//! Pipeline orchestrator.
//!
//! Holds everything a scoring request needs (extractor, model, threshold)
//! as one immutable value built at startup and shared across requests.

use crate::detect::normalize::{normalize, NormalizedSequence, Truncation};
use crate::detect::{Detection, PipelineError, PipelineInput, PredictRequest, ReconstructionScorer};
use crate::extract::EventExtractor;
use crate::EventId;
use std::sync::Arc;
use tracing::{debug, info};

enum ModelState {
    Ready(ReconstructionScorer),
    Unavailable { reason: String, threshold: f64 },
}

/// A request that passed validation and normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub normalized: NormalizedSequence,
    /// The extracted IDs, when the input was log text.
    pub extracted: Option<Vec<EventId>>,
}

pub struct Pipeline {
    extractor: Arc<dyn EventExtractor>,
    model: ModelState,
    truncation: Truncation,
}

impl Pipeline {
    /// A pipeline backed by a loaded model.
    pub fn ready(
        extractor: Arc<dyn EventExtractor>,
        scorer: ReconstructionScorer,
        truncation: Truncation,
    ) -> Self {
        Self {
            extractor,
            model: ModelState::Ready(scorer),
            truncation,
        }
    }

    /// A degraded pipeline whose model failed to load. Every scoring call
    /// fails with [`PipelineError::ModelUnavailable`].
    pub fn degraded(
        extractor: Arc<dyn EventExtractor>,
        reason: impl Into<String>,
        threshold: f64,
    ) -> Self {
        Self {
            extractor,
            model: ModelState::Unavailable {
                reason: reason.into(),
                threshold,
            },
            truncation: Truncation::default(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.model, ModelState::Ready(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.model {
            ModelState::Ready(_) => None,
            ModelState::Unavailable { reason, .. } => Some(reason),
        }
    }

    pub fn threshold(&self) -> f64 {
        match &self.model {
            ModelState::Ready(scorer) => scorer.threshold(),
            ModelState::Unavailable { threshold, .. } => *threshold,
        }
    }

    /// L, as declared by the loaded model.
    pub fn sequence_length(&self) -> Option<usize> {
        match &self.model {
            ModelState::Ready(scorer) => Some(scorer.sequence_length()),
            ModelState::Unavailable { .. } => None,
        }
    }

    pub fn extract(&self, text: &str) -> Vec<EventId> {
        self.extractor.extract(text)
    }

    fn scorer(&self) -> Result<&ReconstructionScorer, PipelineError> {
        match &self.model {
            ModelState::Ready(scorer) => Ok(scorer),
            ModelState::Unavailable { .. } => Err(PipelineError::ModelUnavailable),
        }
    }

    /// Validate, extract and normalize without scoring.
    pub fn prepare(&self, input: PipelineInput) -> Result<Prepared, PipelineError> {
        let len = self.scorer()?.sequence_length();
        let (sequence, extracted) = match input {
            PipelineInput::Text(text) => {
                let ids = self.extractor.extract(&text);
                if ids.is_empty() {
                    return Err(PipelineError::NoEventIds);
                }
                debug!(count = ids.len(), "extracted event ids from log text");
                (ids.clone(), Some(ids))
            }
            PipelineInput::Sequence(ids) => (ids, None),
        };
        if sequence.is_empty() {
            return Err(PipelineError::EmptySequence);
        }
        Ok(Prepared {
            normalized: normalize(&sequence, len, self.truncation),
            extracted,
        })
    }

    /// Score an already validated input.
    pub async fn analyze(&self, input: PipelineInput) -> Result<Detection, PipelineError> {
        let scorer = self.scorer()?;
        let prepared = self.prepare(input)?;
        let score = scorer.score(prepared.normalized).await?;
        info!(
            reconstruction_error = score.reconstruction_error,
            is_anomaly = score.is_anomaly,
            extracted = prepared.extracted.as_ref().map(Vec::len),
            "sequence scored"
        );
        Ok(Detection {
            reconstruction_error: score.reconstruction_error,
            is_anomaly: score.is_anomaly,
            extracted_sequence: prepared.extracted,
        })
    }

    /// Handle a raw request. Model availability is checked before the
    /// payload, so a degraded service answers every request the same way.
    pub async fn handle(&self, request: PredictRequest) -> Result<Detection, PipelineError> {
        self.scorer()?;
        let input = PipelineInput::try_from(request)?;
        self.analyze(input).await
    }
}
