//! Prosodic scores computed from syllables and feature histories.
//!
//! Every function here is total: too little data yields a fixed fallback
//! score instead of an error.

use crate::config::AnalyzerConfig;
use crate::prosody::{
    mean, FeatureHistories, StressAnalysis, StressLabel, StressedSyllable, Syllable,
};
use crate::types::FeatureSample;

const INTENSITY_WEIGHT: f32 = 0.4;
const PITCH_WEIGHT: f32 = 0.3;
const DURATION_WEIGHT: f32 = 0.2;
const SPECTRAL_WEIGHT: f32 = 0.1;
const FACTOR_CEILING: f32 = 2.0;

const DEFAULT_INTENSITY: f32 = 0.001;
const MIN_INTENSITY: f32 = 0.0001;
const DEFAULT_PITCH_HZ: f32 = 200.0;
const MIN_PITCH_HZ: f32 = 80.0;

const NEUTRAL_SPECTRAL_EMPHASIS: f32 = 0.8;
const MIN_SPECTRAL_EMPHASIS: f32 = 0.4;

const RHYTHM_MIN_SYLLABLES: usize = 3;
const RHYTHM_MIN_STRESSED: usize = 2;
const RHYTHM_FEW_SYLLABLES: f32 = 0.5;
const RHYTHM_FEW_STRESSED: f32 = 0.35;
const MIN_INTERVAL_SECS: f64 = 0.001;

const MIN_PITCH_SAMPLES: usize = 3;
const INTONATION_DEFAULT: f32 = 0.35;
const FLAT_RANGE: f32 = 0.12;
const FLAT_SCORE: f32 = 0.3;
const ERRATIC_RANGE: f32 = 0.8;
const ERRATIC_SCORE: f32 = 0.4;
const FULL_RANGE: f32 = 0.5;

const MIN_CENTROID_SAMPLES: usize = 3;
const CLARITY_DEFAULT: f32 = 0.5;
const CLEAR_BAND_HZ: (f32, f32) = (1000.0, 3500.0);
const SPEECH_BAND_HZ: (f32, f32) = (500.0, 5000.0);

#[derive(Debug, Clone)]
pub struct ProsodyScorer {
    reference_duration: f64,
    stress_threshold: f32,
}

/// Recording-wide averages each syllable is compared against.
#[derive(Debug, Clone, Copy)]
struct Baseline {
    intensity: f32,
    pitch: f32,
    centroid: Option<f32>,
}

impl Baseline {
    fn from_histories(histories: &FeatureHistories) -> Self {
        Self {
            intensity: values(&histories.rms).unwrap_or(DEFAULT_INTENSITY),
            pitch: values(&histories.pitch).unwrap_or(DEFAULT_PITCH_HZ),
            centroid: values(&histories.spectral_centroid),
        }
    }
}

fn values(samples: &[FeatureSample]) -> Option<f32> {
    mean(samples.iter().map(|sample| sample.value))
}

impl ProsodyScorer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            reference_duration: config.reference_syllable_secs,
            stress_threshold: config.stress_threshold,
        }
    }

    /// Weighted intensity/pitch/duration/spectral score of one syllable, capped at 1.
    pub fn stress_score(&self, syllable: &Syllable, histories: &FeatureHistories) -> f32 {
        let baseline = Baseline::from_histories(histories);
        self.score_against(syllable, &baseline, &histories.spectral_centroid)
    }

    pub fn is_stressed(&self, score: f32) -> bool {
        score > self.stress_threshold
    }

    pub fn stress_analysis(
        &self,
        syllables: &[Syllable],
        histories: &FeatureHistories,
    ) -> StressAnalysis {
        let scores = self.stress_scores(syllables, histories);
        let mut pattern = Vec::with_capacity(syllables.len());
        let mut stressed = Vec::new();
        for (index, (syllable, &stress)) in syllables.iter().zip(scores.iter()).enumerate() {
            if self.is_stressed(stress) {
                pattern.push(StressLabel::Stressed);
                stressed.push(StressedSyllable {
                    index,
                    stress,
                    duration: syllable.duration,
                    pitch: syllable.avg_pitch,
                    intensity: syllable.avg_energy,
                });
            } else {
                pattern.push(StressLabel::Unstressed);
            }
        }
        StressAnalysis {
            pattern,
            stressed,
            rhythm_score: self.rhythm_from_scores(syllables, &scores),
            intonation_variation: self.intonation_variation(&histories.pitch),
        }
    }

    /// Regularity of the spacing between stressed syllable onsets.
    pub fn rhythm_score(&self, syllables: &[Syllable], histories: &FeatureHistories) -> f32 {
        let scores = self.stress_scores(syllables, histories);
        self.rhythm_from_scores(syllables, &scores)
    }

    /// Banded pitch-range score: both monotone and erratic contours are penalized.
    pub fn intonation_variation(&self, pitch: &[FeatureSample]) -> f32 {
        if pitch.len() < MIN_PITCH_SAMPLES {
            return INTONATION_DEFAULT;
        }
        let voiced: Vec<f32> = pitch
            .iter()
            .map(|sample| sample.value)
            .filter(|&value| value > 0.0)
            .collect();
        let Some(average) = mean(voiced.iter().copied()) else {
            return INTONATION_DEFAULT;
        };
        let min = voiced.iter().copied().fold(f32::INFINITY, f32::min);
        let max = voiced.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let range = if average > 0.0 {
            (max - min) / average
        } else {
            0.0
        };
        if range < FLAT_RANGE {
            FLAT_SCORE
        } else if range > ERRATIC_RANGE {
            ERRATIC_SCORE
        } else {
            (range / FULL_RANGE).min(1.0)
        }
    }

    /// Three-bucket clarity estimate from the mean spectral centroid.
    ///
    /// Silent frames (centroid 0) count toward the mean. A history with no
    /// positive centroid at all is treated as silence and gets the fallback.
    pub fn clarity_score(&self, centroid: &[FeatureSample]) -> f32 {
        if centroid.len() < MIN_CENTROID_SAMPLES
            || !centroid.iter().any(|sample| sample.value > 0.0)
        {
            return CLARITY_DEFAULT;
        }
        let average = values(centroid).unwrap_or(0.0);
        if average > CLEAR_BAND_HZ.0 && average < CLEAR_BAND_HZ.1 {
            0.85
        } else if average > SPEECH_BAND_HZ.0 && average < SPEECH_BAND_HZ.1 {
            0.65
        } else {
            0.45
        }
    }

    fn stress_scores(&self, syllables: &[Syllable], histories: &FeatureHistories) -> Vec<f32> {
        let baseline = Baseline::from_histories(histories);
        syllables
            .iter()
            .map(|syllable| self.score_against(syllable, &baseline, &histories.spectral_centroid))
            .collect()
    }

    fn score_against(
        &self,
        syllable: &Syllable,
        baseline: &Baseline,
        centroid: &[FeatureSample],
    ) -> f32 {
        let intensity =
            (syllable.avg_energy / baseline.intensity.max(MIN_INTENSITY)).min(FACTOR_CEILING);
        let pitch = if syllable.has_pitch() {
            (syllable.avg_pitch / baseline.pitch.max(MIN_PITCH_HZ)).min(FACTOR_CEILING)
        } else {
            1.0
        };
        let duration = if syllable.duration > 0.0 {
            syllable.duration
        } else {
            self.reference_duration
        };
        let duration = ((duration / self.reference_duration) as f32).min(FACTOR_CEILING);
        let spectral = spectral_emphasis(syllable, baseline, centroid);

        let weighted = intensity * INTENSITY_WEIGHT
            + pitch * PITCH_WEIGHT
            + duration * DURATION_WEIGHT
            + spectral * SPECTRAL_WEIGHT;
        weighted.clamp(0.0, 1.0)
    }

    fn rhythm_from_scores(&self, syllables: &[Syllable], scores: &[f32]) -> f32 {
        if syllables.len() < RHYTHM_MIN_SYLLABLES {
            return RHYTHM_FEW_SYLLABLES;
        }
        let onsets: Vec<f64> = syllables
            .iter()
            .zip(scores.iter())
            .filter(|(_, &score)| self.is_stressed(score))
            .map(|(syllable, _)| syllable.start_time)
            .collect();
        if onsets.len() < RHYTHM_MIN_STRESSED {
            return RHYTHM_FEW_STRESSED;
        }
        let intervals: Vec<f64> = onsets.windows(2).map(|pair| pair[1] - pair[0]).collect();
        let count = intervals.len() as f64;
        let average = intervals.iter().sum::<f64>() / count;
        let variance = intervals
            .iter()
            .map(|interval| (interval - average).powi(2))
            .sum::<f64>()
            / count;
        let variation = variance.sqrt() / average.max(MIN_INTERVAL_SECS);
        ((1.0 - variation).max(0.0) as f32).min(1.0)
    }
}

fn spectral_emphasis(syllable: &Syllable, baseline: &Baseline, centroid: &[FeatureSample]) -> f32 {
    let local = mean(
        centroid
            .iter()
            .filter(|sample| {
                sample.timestamp >= syllable.start_time && sample.timestamp <= syllable.end_time
            })
            .map(|sample| sample.value),
    );
    let Some(local) = local else {
        return NEUTRAL_SPECTRAL_EMPHASIS;
    };
    let overall = baseline.centroid.unwrap_or(local);
    if overall <= 0.0 {
        return NEUTRAL_SPECTRAL_EMPHASIS;
    }
    (local / overall).clamp(MIN_SPECTRAL_EMPHASIS, FACTOR_CEILING)
}
