use std::sync::Arc;

use anyhow::{ensure, Result};
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::types::{AudioData, SampleFrame};

pub const DEFAULT_FRAME_SIZE: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingConfig {
    pub frame_size: usize,
    pub hop_size: usize,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            hop_size: DEFAULT_FRAME_SIZE / 2,
        }
    }
}

impl FramingConfig {
    pub fn new(frame_size: usize, hop_size: Option<usize>) -> Result<Self> {
        ensure!(frame_size >= 2, "frame size must be at least 2 samples");
        let hop_size = hop_size.unwrap_or(frame_size / 2);
        ensure!(hop_size > 0, "hop size must be positive");
        ensure!(
            hop_size <= frame_size,
            "hop size {} exceeds frame size {}",
            hop_size,
            frame_size
        );
        Ok(Self {
            frame_size,
            hop_size,
        })
    }
}

/// Slices a mono stream into overlapping frames with a Hann-windowed dB spectrum.
///
/// Samples that do not yet fill a whole frame stay pending until the next push.
pub struct Framer {
    config: FramingConfig,
    sample_rate: u32,
    plan: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    pending: Vec<f32>,
    consumed: u64,
}

impl Framer {
    pub fn new(config: FramingConfig, sample_rate: u32) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(config.frame_size);
        let size = config.frame_size as f32;
        let window = (0..config.frame_size)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1.0)).cos()))
            .collect();
        Self {
            input: plan.make_input_vec(),
            spectrum: plan.make_output_vec(),
            scratch: plan.make_scratch_vec(),
            plan,
            window,
            config,
            sample_rate,
            pending: Vec::with_capacity(config.frame_size * 2),
            consumed: 0,
        }
    }

    /// Frame a whole clip. A trailing partial frame is dropped.
    pub fn frame_clip(config: FramingConfig, audio: &AudioData) -> Vec<SampleFrame> {
        let mut framer = Self::new(config, audio.sample_rate);
        framer.push(&audio.samples)
    }

    pub fn push(&mut self, chunk: &[f32]) -> Vec<SampleFrame> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while self.pending.len() >= self.config.frame_size {
            let samples = self.pending[..self.config.frame_size].to_vec();
            let timestamp = self.consumed as f64 / self.sample_rate.max(1) as f64;
            let spectrum_db = self.spectrum_db(&samples);
            frames.push(SampleFrame::new(
                samples,
                spectrum_db,
                self.sample_rate,
                timestamp,
            ));
            self.pending.drain(..self.config.hop_size);
            self.consumed += self.config.hop_size as u64;
        }
        frames
    }

    /// Magnitude spectrum in dB (`20 log10 |X| / N`), `frame_size / 2` bins.
    ///
    /// Bins with zero magnitude come out as negative infinity.
    fn spectrum_db(&mut self, samples: &[f32]) -> Vec<f32> {
        for ((slot, &sample), &weight) in self.input.iter_mut().zip(samples).zip(&self.window) {
            *slot = sample * weight;
        }
        let bins = self.config.frame_size / 2;
        if self
            .plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .is_err()
        {
            return vec![f32::NEG_INFINITY; bins];
        }
        let scale = self.config.frame_size as f32;
        self.spectrum[..bins]
            .iter()
            .map(|bin| 20.0 * (bin.norm() / scale).log10())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_hop_larger_than_frame() {
        assert!(FramingConfig::new(256, Some(512)).is_err());
        assert_eq!(FramingConfig::new(256, None).unwrap().hop_size, 128);
    }

    #[test]
    fn frames_carry_half_size_spectrum() {
        let audio = AudioData {
            samples: vec![0.0; 1_000],
            sample_rate: 8_000,
        };
        let config = FramingConfig::new(256, Some(128)).unwrap();
        let frames = Framer::frame_clip(config, &audio);
        // (1000 - 256) / 128 + 1
        assert_eq!(frames.len(), 6);
        assert_eq!(frames[0].spectrum_db().len(), 128);
        assert!((frames[1].timestamp() - 128.0 / 8_000.0).abs() < 1e-9);
        assert!(frames[0]
            .spectrum_db()
            .iter()
            .all(|db| *db == f32::NEG_INFINITY));
    }

    #[test]
    fn streaming_push_keeps_remainder() {
        let config = FramingConfig::new(64, Some(64)).unwrap();
        let mut framer = Framer::new(config, 16_000);
        assert!(framer.push(&[0.1; 40]).is_empty());
        let frames = framer.push(&[0.1; 100]);
        assert_eq!(frames.len(), 2);
        assert!((frames[1].timestamp() - 64.0 / 16_000.0).abs() < 1e-9);
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        let sample_rate = 16_000;
        let samples: Vec<f32> = (0..512)
            .map(|i| (2.0 * std::f32::consts::PI * 1_000.0 * i as f32 / sample_rate as f32).sin())
            .collect();
        let mut framer = Framer::new(FramingConfig::new(512, None).unwrap(), sample_rate);
        let frames = framer.push(&samples);
        let spectrum = frames[0].spectrum_db();
        let peak = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| index)
            .unwrap();
        // 1 kHz at 16 kHz / 512 = 31.25 Hz per bin
        assert_eq!(peak, 32);
    }
}
