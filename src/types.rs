//! Core types shared by the capture adapters and the prosody engine

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Raw audio data representation (mono, f32 samples)
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g., 44100)
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// One analysis window handed to the engine by a capture adapter.
///
/// Holds the time-domain samples of the window together with the decibel
/// spectrum of the same window (`samples.len() / 2` bins). Frames are
/// immutable once built; clones share the underlying buffers.
#[derive(Debug, Clone)]
pub struct SampleFrame {
    samples: Arc<[f32]>,
    spectrum_db: Arc<[f32]>,
    sample_rate: u32,
    timestamp: f64,
}

impl SampleFrame {
    pub fn new(
        samples: impl Into<Arc<[f32]>>,
        spectrum_db: impl Into<Arc<[f32]>>,
        sample_rate: u32,
        timestamp: f64,
    ) -> Self {
        Self {
            samples: samples.into(),
            spectrum_db: spectrum_db.into(),
            sample_rate,
            timestamp,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn spectrum_db(&self) -> &[f32] {
        &self.spectrum_db
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Seconds since the start of the stream.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// A scalar feature value tagged with the timestamp of the frame it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSample {
    pub value: f32,
    pub timestamp: f64,
}

impl FeatureSample {
    pub fn new(value: f32, timestamp: f64) -> Self {
        Self { value, timestamp }
    }
}
