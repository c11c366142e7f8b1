mod history;
mod pitch;

pub use history::FeatureHistory;
pub use pitch::{PitchDetector, PitchEstimate};

use crate::config::AnalyzerConfig;
use crate::prosody::{FeatureHistories, ProsodyError, Result};
use crate::types::{FeatureSample, SampleFrame};

/// Scalar features computed from a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameFeatures {
    pub timestamp: f64,
    pub rms: f32,
    pub zcr: f32,
    pub spectral_centroid: f32,
    pub pitch: Option<f32>,
}

/// Turns sample frames into bounded per-feature histories.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    detector: PitchDetector,
    rms: FeatureHistory,
    zcr: FeatureHistory,
    spectral_centroid: FeatureHistory,
    pitch: FeatureHistory,
}

impl FeatureExtractor {
    pub fn new(config: &AnalyzerConfig) -> Self {
        let capacity = config.history_capacity;
        Self {
            detector: PitchDetector::new(config),
            rms: FeatureHistory::with_capacity(capacity),
            zcr: FeatureHistory::with_capacity(capacity),
            spectral_centroid: FeatureHistory::with_capacity(capacity),
            pitch: FeatureHistory::with_capacity(capacity),
        }
    }

    /// Compute the features of `frame` and append them to the histories.
    ///
    /// A rejected frame leaves every history untouched. Frames must arrive in
    /// timestamp order; one older than the newest recorded frame is rejected.
    pub fn extract(&mut self, frame: &SampleFrame) -> Result<FrameFeatures> {
        if let Some(newest) = self.rms.last() {
            if frame.timestamp() < newest.timestamp {
                return Err(ProsodyError::InvalidInput(format!(
                    "frame at {:.3}s precedes the newest frame at {:.3}s",
                    frame.timestamp(),
                    newest.timestamp
                )));
            }
        }
        let features = self.compute(frame)?;
        let timestamp = features.timestamp;
        self.rms.push(FeatureSample::new(features.rms, timestamp));
        self.zcr.push(FeatureSample::new(features.zcr, timestamp));
        self.spectral_centroid
            .push(FeatureSample::new(features.spectral_centroid, timestamp));
        if let Some(pitch) = features.pitch {
            self.pitch.push(FeatureSample::new(pitch, timestamp));
        }
        Ok(features)
    }

    /// Compute the features of `frame` without recording them.
    pub fn compute(&self, frame: &SampleFrame) -> Result<FrameFeatures> {
        validate_frame(frame)?;
        let samples = frame.samples();
        Ok(FrameFeatures {
            timestamp: frame.timestamp(),
            rms: rms(samples),
            zcr: zero_crossing_rate(samples),
            spectral_centroid: spectral_centroid(frame.spectrum_db(), frame.sample_rate()),
            pitch: self.detector.detect(samples, frame.sample_rate()),
        })
    }

    pub fn histories(&self) -> FeatureHistories {
        FeatureHistories {
            rms: self.rms.to_vec(),
            zcr: self.zcr.to_vec(),
            spectral_centroid: self.spectral_centroid.to_vec(),
            pitch: self.pitch.to_vec(),
        }
    }

    pub fn latest_pitch(&self) -> Option<f32> {
        self.pitch.last().map(|sample| sample.value)
    }

    pub fn clear(&mut self) {
        self.rms.clear();
        self.zcr.clear();
        self.spectral_centroid.clear();
        self.pitch.clear();
    }
}

fn validate_frame(frame: &SampleFrame) -> Result<()> {
    if frame.samples().is_empty() {
        return Err(ProsodyError::InvalidInput(format!(
            "frame at {:.3}s has no samples",
            frame.timestamp()
        )));
    }
    if !frame.timestamp().is_finite() {
        return Err(ProsodyError::InvalidInput(
            "frame timestamp is not finite".to_string(),
        ));
    }
    if frame.sample_rate() == 0 {
        return Err(ProsodyError::InvalidInput(format!(
            "frame at {:.3}s has a zero sample rate",
            frame.timestamp()
        )));
    }
    Ok(())
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Fraction of adjacent pairs whose sign differs. Zero counts as positive.
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

/// Magnitude-weighted mean frequency of a decibel spectrum; 0 for silence.
pub fn spectral_centroid(spectrum_db: &[f32], sample_rate: u32) -> f32 {
    if spectrum_db.is_empty() {
        return 0.0;
    }
    let bin_hz = sample_rate as f64 / (2 * spectrum_db.len()) as f64;
    let mut weighted = 0.0f64;
    let mut total = 0.0f64;
    for (index, &db) in spectrum_db.iter().enumerate() {
        let magnitude = 10f64.powf(db as f64 / 10.0);
        if !magnitude.is_finite() {
            continue;
        }
        weighted += index as f64 * bin_hz * magnitude;
        total += magnitude;
    }
    if total > 0.0 {
        (weighted / total) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: Vec<f32>, spectrum: Vec<f32>, timestamp: f64) -> SampleFrame {
        SampleFrame::new(samples, spectrum, 16_000, timestamp)
    }

    #[test]
    fn rms_of_constant_signal() {
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zcr_counts_sign_changes() {
        assert_eq!(zero_crossing_rate(&[1.0, -1.0, 1.0, -1.0, 1.0]), 1.0);
        assert_eq!(zero_crossing_rate(&[0.0; 8]), 0.0);
        assert!((zero_crossing_rate(&[1.0, 1.0, -1.0]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn centroid_of_single_bin() {
        let mut spectrum = vec![f32::NEG_INFINITY; 8];
        spectrum[2] = 0.0;
        // bin 2 of 8 at 16 kHz: 2 * 16000 / 16 = 2000 Hz
        assert!((spectral_centroid(&spectrum, 16_000) - 2000.0).abs() < 1e-3);
    }

    #[test]
    fn centroid_of_silence_is_zero() {
        let spectrum = vec![f32::NEG_INFINITY; 16];
        assert_eq!(spectral_centroid(&spectrum, 16_000), 0.0);
    }

    #[test]
    fn empty_frame_is_rejected_without_side_effects() {
        let mut extractor = FeatureExtractor::new(&AnalyzerConfig::default());
        let err = extractor
            .extract(&frame(Vec::new(), Vec::new(), 0.0))
            .unwrap_err();
        assert!(matches!(err, ProsodyError::InvalidInput(_)));
        assert!(extractor.histories().rms.is_empty());
    }

    #[test]
    fn silent_frame_appends_no_pitch() {
        let mut extractor = FeatureExtractor::new(&AnalyzerConfig::default());
        let features = extractor
            .extract(&frame(vec![0.0; 512], vec![f32::NEG_INFINITY; 256], 0.1))
            .unwrap();
        assert_eq!(features.rms, 0.0);
        assert_eq!(features.zcr, 0.0);
        assert!(features.pitch.is_none());
        let histories = extractor.histories();
        assert_eq!(histories.rms.len(), 1);
        assert!(histories.pitch.is_empty());
    }

    #[test]
    fn out_of_order_frame_is_rejected() {
        let mut extractor = FeatureExtractor::new(&AnalyzerConfig::default());
        extractor
            .extract(&frame(vec![0.1; 64], vec![-20.0; 32], 0.5))
            .unwrap();
        let err = extractor
            .extract(&frame(vec![0.1; 64], vec![-20.0; 32], 0.4))
            .unwrap_err();
        assert!(matches!(err, ProsodyError::InvalidInput(_)));
        assert_eq!(extractor.histories().rms.len(), 1);

        extractor.clear();
        assert!(extractor
            .extract(&frame(vec![0.1; 64], vec![-20.0; 32], 0.0))
            .is_ok());
    }

    #[test]
    fn histories_respect_capacity() {
        let config = AnalyzerConfig {
            history_capacity: 5,
            ..AnalyzerConfig::default()
        };
        let mut extractor = FeatureExtractor::new(&config);
        for index in 0..12 {
            extractor
                .extract(&frame(vec![0.1; 64], vec![-20.0; 32], index as f64 * 0.01))
                .unwrap();
        }
        let histories = extractor.histories();
        assert_eq!(histories.rms.len(), 5);
        assert_eq!(histories.zcr.len(), 5);
        assert_eq!(histories.spectral_centroid.len(), 5);
        assert!((histories.rms[0].timestamp - 0.07).abs() < 1e-9);
    }
}
