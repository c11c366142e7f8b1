//! Energy-based syllable segmentation.
//!
//! The voicing threshold adapts to the recording level: half the median RMS,
//! floored so that near-silent recordings do not produce a threshold of zero.
//! Segmentation is recomputed from scratch on every call, so it works on a
//! history that is still growing.

use crate::config::AnalyzerConfig;
use crate::prosody::Syllable;
use crate::types::FeatureSample;

const EMPTY_HISTORY_THRESHOLD: f32 = 0.005;

#[derive(Debug, Clone)]
pub struct SyllableSegmenter {
    energy_floor: f32,
    threshold_ratio: f32,
    pitch_join_window: f64,
}

impl SyllableSegmenter {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            energy_floor: config.energy_floor,
            threshold_ratio: config.threshold_ratio,
            pitch_join_window: config.pitch_join_window_secs,
        }
    }

    pub fn energy_threshold(&self, rms: &[FeatureSample]) -> f32 {
        if rms.is_empty() {
            return EMPTY_HISTORY_THRESHOLD;
        }
        let mut energies: Vec<f32> = rms.iter().map(|sample| sample.value).collect();
        energies.sort_by(|a, b| a.total_cmp(b));
        let median = energies[energies.len() / 2];
        (median * self.threshold_ratio).max(self.energy_floor)
    }

    /// Split the RMS timeline into voiced segments, joining pitch samples by time.
    pub fn segment(&self, rms: &[FeatureSample], pitch: &[FeatureSample]) -> Vec<Syllable> {
        let threshold = self.energy_threshold(rms);
        let mut syllables = Vec::new();
        let mut open: Option<OpenSyllable> = None;

        for sample in rms {
            let voiced = sample.value > threshold;
            match (open.as_mut(), voiced) {
                (None, true) => open = Some(OpenSyllable::begin(sample)),
                (Some(current), true) => {
                    current.absorb(sample.value);
                    let joined = nearest_pitch(pitch, sample.timestamp, self.pitch_join_window);
                    if let Some(frequency) = joined {
                        current.add_pitch(frequency);
                    }
                }
                (Some(_), false) => {
                    if let Some(current) = open.take() {
                        syllables.push(current.finish(sample.timestamp));
                    }
                }
                (None, false) => {}
            }
        }

        if let (Some(current), Some(last)) = (open, rms.last()) {
            syllables.push(current.finish(last.timestamp));
        }
        syllables
    }
}

/// Segment still being accumulated; finalized into a [`Syllable`] on offset.
#[derive(Debug)]
struct OpenSyllable {
    start_time: f64,
    peak_energy: f32,
    energy_sum: f32,
    samples: usize,
    pitch_sum: f32,
    pitch_count: usize,
}

impl OpenSyllable {
    fn begin(sample: &FeatureSample) -> Self {
        Self {
            start_time: sample.timestamp,
            peak_energy: sample.value,
            energy_sum: sample.value,
            samples: 1,
            pitch_sum: 0.0,
            pitch_count: 0,
        }
    }

    fn absorb(&mut self, energy: f32) {
        self.peak_energy = self.peak_energy.max(energy);
        self.energy_sum += energy;
        self.samples += 1;
    }

    fn add_pitch(&mut self, frequency: f32) {
        self.pitch_sum += frequency;
        self.pitch_count += 1;
    }

    fn finish(self, end_time: f64) -> Syllable {
        let avg_pitch = if self.pitch_count > 0 {
            self.pitch_sum / self.pitch_count as f32
        } else {
            0.0
        };
        Syllable {
            start_time: self.start_time,
            end_time,
            duration: end_time - self.start_time,
            peak_energy: self.peak_energy,
            energy_sum: self.energy_sum,
            sample_count: self.samples,
            pitch_sum: self.pitch_sum,
            pitch_count: self.pitch_count,
            avg_energy: self.energy_sum / self.samples.max(1) as f32,
            avg_pitch,
        }
    }
}

/// Pitch value closest in time to `timestamp`, if strictly within `window`.
///
/// `pitch` must be ordered by timestamp. Ties resolve to the earlier sample.
fn nearest_pitch(pitch: &[FeatureSample], timestamp: f64, window: f64) -> Option<f32> {
    let split = pitch.partition_point(|sample| sample.timestamp < timestamp);
    let before = split.checked_sub(1).and_then(|index| pitch.get(index));
    let after = pitch.get(split);
    let nearest = match (before, after) {
        (Some(b), Some(a)) => {
            if (timestamp - b.timestamp) <= (a.timestamp - timestamp) {
                b
            } else {
                a
            }
        }
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => return None,
    };
    ((nearest.timestamp - timestamp).abs() < window).then_some(nearest.value)
}
