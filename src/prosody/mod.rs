pub mod assessment;
pub mod cli;
pub mod features;
pub mod scoring;
pub mod segmentation;
pub mod session;

use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::types::FeatureSample;

pub use session::{
    CaptureContext, ClipSource, EngineState, FrameSource, InputDeviceContext, LiveFrameSource,
    OfflineContext, ProsodyAnalyzer, PumpOutcome,
};

/// Convenient alias for results returned by prosody modules.
pub type Result<T> = std::result::Result<T, ProsodyError>;

/// Failure modes of the prosody engine.
///
/// Numeric edge cases (silence, too few samples) never surface here; the
/// scoring functions fall back to fixed constants instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ProsodyError {
    /// The capture context could not be acquired.
    Initialization(String),
    /// Frames or analysis were requested before `initialize`.
    NotInitialized,
    /// A malformed frame or a call that is invalid in the current state.
    InvalidInput(String),
    /// The frame source failed after initialization.
    Capture(String),
    /// Analyzer configuration is out of range.
    Config(String),
}

impl Display for ProsodyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialization(message) => {
                write!(f, "failed to initialize capture context: {}", message)
            }
            Self::NotInitialized => write!(f, "analyzer has not been initialized"),
            Self::InvalidInput(message) => write!(f, "invalid input: {}", message),
            Self::Capture(message) => write!(f, "capture error: {}", message),
            Self::Config(message) => write!(f, "invalid analyzer config: {}", message),
        }
    }
}

impl Error for ProsodyError {}

/// A contiguous above-threshold energy segment, used as a syllable proxy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Syllable {
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub peak_energy: f32,
    pub energy_sum: f32,
    pub sample_count: usize,
    pub pitch_sum: f32,
    pub pitch_count: usize,
    pub avg_energy: f32,
    /// Mean joined pitch in Hz, or 0 when no pitch sample was joined.
    pub avg_pitch: f32,
}

impl Syllable {
    pub fn has_pitch(&self) -> bool {
        self.avg_pitch > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StressLabel {
    Stressed,
    Unstressed,
}

impl StressLabel {
    pub fn symbol(self) -> char {
        match self {
            Self::Stressed => 'S',
            Self::Unstressed => 'U',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StressedSyllable {
    /// Position of the syllable in the segmented sequence.
    pub index: usize,
    pub stress: f32,
    pub duration: f64,
    pub pitch: f32,
    pub intensity: f32,
}

/// Stress view derived from the current syllable sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StressAnalysis {
    pub pattern: Vec<StressLabel>,
    pub stressed: Vec<StressedSyllable>,
    pub rhythm_score: f32,
    pub intonation_variation: f32,
}

impl StressAnalysis {
    pub fn syllable_count(&self) -> usize {
        self.pattern.len()
    }

    pub fn pattern_string(&self) -> String {
        self.pattern.iter().map(|label| label.symbol()).collect()
    }
}

/// Bounded-range pronunciation scores, all in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PronunciationAssessment {
    pub stress_accuracy: f32,
    pub intonation_naturalness: f32,
    pub rhythm_fluency: f32,
    pub pronunciation_clarity: f32,
    pub overall: f32,
}

/// Snapshot of the four bounded feature histories, oldest entry first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureHistories {
    pub rms: Vec<FeatureSample>,
    pub zcr: Vec<FeatureSample>,
    pub spectral_centroid: Vec<FeatureSample>,
    /// Sparser than the others: unvoiced frames contribute no entry.
    pub pitch: Vec<FeatureSample>,
}

/// Everything the engine can tell a caller about the current recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureReport {
    pub histories: FeatureHistories,
    pub syllables: Vec<Syllable>,
    pub stress: StressAnalysis,
    pub assessment: PronunciationAssessment,
}

pub(crate) fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let mut total = 0.0;
    let mut count = 0usize;
    for value in values {
        total += value;
        count += 1;
    }
    (count > 0).then(|| total / count as f32)
}
