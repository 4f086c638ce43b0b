//! Request payload and its validated form.

use crate::detect::PipelineError;
use crate::EventId;
use serde::Deserialize;
use serde_json::Value;

/// Raw prediction payload as received from a caller.
///
/// Fields stay untyped so that a wrongly typed field produces a precise
/// validation message instead of a generic decode failure. `null` counts as
/// absent.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub log_text: Option<Value>,
    #[serde(default)]
    pub sequence: Option<Value>,
}

impl PredictRequest {
    pub fn from_log_text(text: impl Into<String>) -> Self {
        Self {
            log_text: Some(Value::String(text.into())),
            sequence: None,
        }
    }

    pub fn from_sequence(sequence: &[EventId]) -> Self {
        Self {
            log_text: None,
            sequence: Some(Value::from(sequence.to_vec())),
        }
    }
}

/// What the pipeline scores: log text to extract from, or explicit IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineInput {
    Text(String),
    Sequence(Vec<EventId>),
}

fn parse_sequence(value: Value) -> Result<Vec<EventId>, PipelineError> {
    let items = match value {
        Value::Array(items) => items,
        _ => return Err(PipelineError::BadSequenceFormat("must be a list".into())),
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_u64()
                .and_then(|v| EventId::try_from(v).ok())
                .ok_or_else(|| {
                    PipelineError::BadSequenceFormat(format!(
                        "element {i} is not a non-negative integer event ID"
                    ))
                })
        })
        .collect()
}

impl TryFrom<PredictRequest> for PipelineInput {
    type Error = PipelineError;

    /// `log_text` wins when both fields are present.
    fn try_from(req: PredictRequest) -> Result<Self, Self::Error> {
        match (req.log_text, req.sequence) {
            (Some(Value::String(text)), _) => Ok(PipelineInput::Text(text)),
            (Some(_), _) => Err(PipelineError::BadLogText),
            (None, Some(seq)) => parse_sequence(seq).map(PipelineInput::Sequence),
            (None, None) => Err(PipelineError::MissingInput),
        }
    }
}
