//! Fixed-length normalization of event sequences.

use crate::EventId;
use serde::{Deserialize, Serialize};

/// Reserved filler value; event codes start at 1.
pub const PADDING_VALUE: EventId = 0;

/// Which end of an over-long sequence is discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Truncation {
    /// Keep the first `len` events.
    #[default]
    Post,
    /// Keep the last `len` events.
    Pre,
}

/// A sequence whose length matches the model's timestep count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSequence(Vec<EventId>);

impl NormalizedSequence {
    pub fn as_slice(&self) -> &[EventId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<EventId> {
        self.0
    }
}

/// Pad with [`PADDING_VALUE`] at the end, or truncate, to exactly `len` events.
pub fn normalize(sequence: &[EventId], len: usize, truncation: Truncation) -> NormalizedSequence {
    let mut out = if sequence.len() > len {
        match truncation {
            Truncation::Post => sequence[..len].to_vec(),
            Truncation::Pre => sequence[sequence.len() - len..].to_vec(),
        }
    } else {
        sequence.to_vec()
    };
    out.resize(len, PADDING_VALUE);
    NormalizedSequence(out)
}
