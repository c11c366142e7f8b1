use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::prosody::ProsodyError;

/// Tunable constants of the prosody engine.
///
/// The defaults are the empirically chosen values the scoring bands were
/// calibrated against. Changing any of them shifts score distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Maximum number of entries kept per feature history.
    pub history_capacity: usize,
    /// Lowest fundamental searched by the pitch detector (Hz).
    pub min_pitch_hz: f32,
    /// Highest fundamental searched by the pitch detector (Hz).
    pub max_pitch_hz: f32,
    /// Upper sanity bound for an accepted pitch estimate (Hz).
    pub max_accepted_pitch_hz: f32,
    /// Minimum normalized autocorrelation for a pitch estimate (inclusive).
    pub correlation_threshold: f32,
    /// Zero-lag energy at or below which a frame counts as silent.
    pub silence_energy: f32,
    /// Absolute floor of the voicing threshold.
    pub energy_floor: f32,
    /// Multiplier applied to the median RMS to get the voicing threshold.
    pub threshold_ratio: f32,
    /// Maximum distance between an RMS sample and the pitch sample joined to it.
    pub pitch_join_window_secs: f64,
    /// Syllable duration that scores 1.0 on the duration factor.
    pub reference_syllable_secs: f64,
    /// Stress score above which a syllable is labeled stressed.
    pub stress_threshold: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            history_capacity: 800,
            min_pitch_hz: 50.0,
            max_pitch_hz: 500.0,
            max_accepted_pitch_hz: 800.0,
            correlation_threshold: 0.25,
            silence_energy: 1e-6,
            energy_floor: 0.003,
            threshold_ratio: 0.5,
            pitch_join_window_secs: 0.06,
            reference_syllable_secs: 0.15,
            stress_threshold: 0.6,
        }
    }
}

impl AnalyzerConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read analyzer config at {:?}", path))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse analyzer config at {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve an optional override path, falling back to the defaults.
    pub fn from_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(custom) => Self::from_file(custom),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ProsodyError> {
        if self.history_capacity == 0 {
            return Err(ProsodyError::Config(
                "history_capacity must be positive".to_string(),
            ));
        }
        if !(self.min_pitch_hz > 0.0 && self.max_pitch_hz > self.min_pitch_hz) {
            return Err(ProsodyError::Config(format!(
                "pitch search range {}..{} Hz is invalid",
                self.min_pitch_hz, self.max_pitch_hz
            )));
        }
        if self.max_accepted_pitch_hz < self.max_pitch_hz {
            return Err(ProsodyError::Config(
                "max_accepted_pitch_hz must not be below max_pitch_hz".to_string(),
            ));
        }
        if self.pitch_join_window_secs <= 0.0 || self.reference_syllable_secs <= 0.0 {
            return Err(ProsodyError::Config(
                "time windows must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
