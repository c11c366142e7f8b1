//! Per-frame fundamental frequency estimation by normalized autocorrelation.
//!
//! Each frame is judged on its own. There is no track continuity between
//! frames, so an occasional octave jump or dropout reaches the history as-is
//! and is absorbed later by averaging.

use crate::config::AnalyzerConfig;

/// Best autocorrelation peak found in a frame, before the acceptance gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    pub frequency: f32,
    pub correlation: f32,
    pub period: usize,
}

#[derive(Debug, Clone)]
pub struct PitchDetector {
    min_hz: f32,
    max_hz: f32,
    max_accepted_hz: f32,
    correlation_threshold: f32,
    silence_energy: f32,
}

impl PitchDetector {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            min_hz: config.min_pitch_hz,
            max_hz: config.max_pitch_hz,
            max_accepted_hz: config.max_accepted_pitch_hz,
            correlation_threshold: config.correlation_threshold,
            silence_energy: config.silence_energy,
        }
    }

    /// Accepted fundamental rounded to whole Hz, or `None` for
    /// unvoiced/undetermined frames.
    pub fn detect(&self, samples: &[f32], sample_rate: u32) -> Option<f32> {
        self.best_peak(samples, sample_rate)
            .filter(|estimate| self.accepts(estimate))
            .map(|estimate| estimate.frequency.round())
    }

    /// The threshold is inclusive: a peak of exactly `correlation_threshold` passes.
    pub fn accepts(&self, estimate: &PitchEstimate) -> bool {
        estimate.correlation >= self.correlation_threshold
            && estimate.frequency >= self.min_hz
            && estimate.frequency <= self.max_accepted_hz
    }

    /// Strongest positive normalized autocorrelation peak in the voice range.
    pub fn best_peak(&self, samples: &[f32], sample_rate: u32) -> Option<PitchEstimate> {
        let n = samples.len();
        if n < 2 || sample_rate == 0 {
            return None;
        }
        let centered = remove_dc(samples);
        let energy: f64 = centered.iter().map(|s| s * s).sum();
        if energy <= self.silence_energy as f64 {
            return None;
        }

        let rate = sample_rate as f32;
        let min_period = ((rate / self.max_hz).floor() as usize).max(1);
        let max_period = ((rate / self.min_hz).floor() as usize).min(n / 2);

        let mut best: Option<(usize, f64)> = None;
        for period in min_period..=max_period {
            let correlation = lagged_product(&centered, period) / energy;
            let best_so_far = best.map_or(0.0, |(_, value)| value);
            if correlation > best_so_far {
                best = Some((period, correlation));
            }
        }

        best.map(|(period, correlation)| PitchEstimate {
            frequency: rate / period as f32,
            correlation: correlation as f32,
            period,
        })
    }
}

fn remove_dc(samples: &[f32]) -> Vec<f64> {
    let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64;
    samples.iter().map(|&s| s as f64 - mean).collect()
}

fn lagged_product(samples: &[f64], lag: usize) -> f64 {
    samples
        .iter()
        .zip(samples.iter().skip(lag))
        .map(|(a, b)| a * b)
        .sum()
}
