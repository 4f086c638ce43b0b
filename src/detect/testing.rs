//! Stand-in models for exercising the scorer, pipeline and API.

use crate::model::{ModelError, ReconstructionModel};
use crate::EventId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Reconstructs every timestep as the same value.
pub struct ConstantModel {
    timesteps: usize,
    value: f32,
}

impl ConstantModel {
    pub fn new(timesteps: usize, value: f32) -> Self {
        Self { timesteps, value }
    }
}

impl ReconstructionModel for ConstantModel {
    fn timesteps(&self) -> usize {
        self.timesteps
    }

    fn reconstruct(&self, batch: &[Vec<EventId>]) -> Result<Vec<Vec<f32>>, ModelError> {
        Ok(batch.iter().map(|row| vec![self.value; row.len()]).collect())
    }
}

/// Echoes its input back (zero error) and records what it was given.
pub struct CountingModel {
    timesteps: usize,
    pub calls: AtomicUsize,
    pub last_input: std::sync::Mutex<Option<Vec<EventId>>>,
}

impl CountingModel {
    pub fn new(timesteps: usize) -> Self {
        Self {
            timesteps,
            calls: AtomicUsize::new(0),
            last_input: std::sync::Mutex::new(None),
        }
    }
}

impl ReconstructionModel for CountingModel {
    fn timesteps(&self) -> usize {
        self.timesteps
    }

    fn reconstruct(&self, batch: &[Vec<EventId>]) -> Result<Vec<Vec<f32>>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_input.lock() {
            *last = batch.first().cloned();
        }
        Ok(batch
            .iter()
            .map(|row| row.iter().map(|&v| v as f32).collect())
            .collect())
    }
}

pub struct SlowModel {
    timesteps: usize,
    delay: Duration,
}

impl SlowModel {
    pub fn new(timesteps: usize, delay: Duration) -> Self {
        Self { timesteps, delay }
    }
}

impl ReconstructionModel for SlowModel {
    fn timesteps(&self) -> usize {
        self.timesteps
    }

    fn reconstruct(&self, batch: &[Vec<EventId>]) -> Result<Vec<Vec<f32>>, ModelError> {
        std::thread::sleep(self.delay);
        Ok(batch.iter().map(|row| vec![0.0; row.len()]).collect())
    }
}

pub struct PanickingModel {
    timesteps: usize,
}

impl PanickingModel {
    pub fn new(timesteps: usize) -> Self {
        Self { timesteps }
    }
}

impl ReconstructionModel for PanickingModel {
    fn timesteps(&self) -> usize {
        self.timesteps
    }

    fn reconstruct(&self, _batch: &[Vec<EventId>]) -> Result<Vec<Vec<f32>>, ModelError> {
        panic!("inference blew up");
    }
}

/// Returns one value fewer than asked for.
pub struct WrongShapeModel {
    timesteps: usize,
}

impl WrongShapeModel {
    pub fn new(timesteps: usize) -> Self {
        Self { timesteps }
    }
}

impl ReconstructionModel for WrongShapeModel {
    fn timesteps(&self) -> usize {
        self.timesteps
    }

    fn reconstruct(&self, batch: &[Vec<EventId>]) -> Result<Vec<Vec<f32>>, ModelError> {
        Ok(batch
            .iter()
            .map(|row| vec![0.0; row.len().saturating_sub(1)])
            .collect())
    }
}
