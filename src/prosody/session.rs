use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::audio::capture::{probe_input, CaptureConfig, LiveCapture};
use crate::audio::framer::{Framer, FramingConfig};
use crate::config::AnalyzerConfig;
use crate::types::{AudioData, SampleFrame};

use super::assessment::AssessmentAggregator;
use super::features::{FeatureExtractor, FrameFeatures};
use super::scoring::ProsodyScorer;
use super::segmentation::SyllableSegmenter;
use super::{
    FeatureHistories, FeatureReport, ProsodyError, PronunciationAssessment, Result,
    StressAnalysis, Syllable,
};

const FRAME_POLL_MS: u64 = 20;
const DEBUG_FRAME_INTERVAL: usize = 50;

/// Platform audio context that must be acquirable before frames can flow.
pub trait CaptureContext {
    /// Returns a short description of the acquired context.
    fn acquire(&self) -> anyhow::Result<String>;
}

/// Context for pre-recorded audio; always available.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineContext;

impl CaptureContext for OfflineContext {
    fn acquire(&self) -> anyhow::Result<String> {
        Ok("offline".to_string())
    }
}

/// Context backed by a cpal input device.
#[derive(Debug, Default, Clone)]
pub struct InputDeviceContext {
    pub device_name: Option<String>,
}

impl CaptureContext for InputDeviceContext {
    fn acquire(&self) -> anyhow::Result<String> {
        probe_input(self.device_name.as_deref())
    }
}

/// Supplier of successive sample frames.
pub trait FrameSource {
    /// Begin producing frames; returns the stream's sample rate.
    fn start(&mut self) -> Result<u32>;
    /// Next frame, waiting at most `timeout`. `None` means nothing is ready yet.
    fn next_frame(&mut self, timeout: Duration) -> Option<SampleFrame>;
    /// True once the source will never yield another frame.
    fn is_exhausted(&self) -> bool {
        false
    }
    fn stop(&mut self);
}

/// Frames of a recorded clip, replayed in order.
pub struct ClipSource {
    sample_rate: u32,
    frames: VecDeque<SampleFrame>,
    started: bool,
}

impl ClipSource {
    pub fn from_frames(sample_rate: u32, frames: Vec<SampleFrame>) -> Self {
        Self {
            sample_rate,
            frames: frames.into(),
            started: false,
        }
    }

    pub fn from_audio(audio: &AudioData, framing: FramingConfig) -> Self {
        Self::from_frames(audio.sample_rate, Framer::frame_clip(framing, audio))
    }
}

impl FrameSource for ClipSource {
    fn start(&mut self) -> Result<u32> {
        self.started = true;
        Ok(self.sample_rate)
    }

    fn next_frame(&mut self, _timeout: Duration) -> Option<SampleFrame> {
        if !self.started {
            return None;
        }
        self.frames.pop_front()
    }

    fn is_exhausted(&self) -> bool {
        self.frames.is_empty()
    }

    fn stop(&mut self) {
        self.started = false;
    }
}

/// Microphone frames: cpal chunks re-sliced into analysis windows.
pub struct LiveFrameSource {
    capture: CaptureConfig,
    framing: FramingConfig,
    live: Option<LiveCapture>,
    framer: Option<Framer>,
    ready: VecDeque<SampleFrame>,
}

impl LiveFrameSource {
    pub fn new(capture: CaptureConfig, framing: FramingConfig) -> Self {
        Self {
            capture,
            framing,
            live: None,
            framer: None,
            ready: VecDeque::new(),
        }
    }
}

impl FrameSource for LiveFrameSource {
    fn start(&mut self) -> Result<u32> {
        let live = LiveCapture::start(&self.capture)
            .map_err(|err| ProsodyError::Capture(format!("{:#}", err)))?;
        let sample_rate = live.sample_rate();
        self.framer = Some(Framer::new(self.framing, sample_rate));
        self.live = Some(live);
        self.ready.clear();
        Ok(sample_rate)
    }

    fn next_frame(&mut self, timeout: Duration) -> Option<SampleFrame> {
        if let Some(frame) = self.ready.pop_front() {
            return Some(frame);
        }
        let chunk = self.live.as_ref()?.recv_chunk(timeout)?;
        let framer = self.framer.as_mut()?;
        self.ready.extend(framer.push(&chunk));
        self.ready.pop_front()
    }

    fn stop(&mut self) {
        if let Some(live) = self.live.take() {
            live.stop();
        }
        self.framer = None;
        self.ready.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Stopped,
    Running,
}

/// Result of a single [`ProsodyAnalyzer::pump`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    Processed,
    /// The frame was malformed and dropped; intake continues.
    Skipped,
    /// No frame was ready within the poll timeout.
    Idle,
    Exhausted,
    Stopped,
}

/// Frame-driven prosody engine.
///
/// Frames are processed one at a time on the caller's thread. Segmentation
/// and scoring are pulled on demand against whatever history exists, so they
/// can be called mid-recording for a preview.
pub struct ProsodyAnalyzer {
    extractor: FeatureExtractor,
    segmenter: SyllableSegmenter,
    scorer: ProsodyScorer,
    aggregator: AssessmentAggregator,
    state: EngineState,
    source: Option<Box<dyn FrameSource>>,
    frames_processed: usize,
}

impl ProsodyAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extractor: FeatureExtractor::new(&config),
            segmenter: SyllableSegmenter::new(&config),
            scorer: ProsodyScorer::new(&config),
            aggregator: AssessmentAggregator,
            state: EngineState::Uninitialized,
            source: None,
            frames_processed: 0,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    pub fn initialize(&mut self, context: &dyn CaptureContext) -> Result<()> {
        if self.state == EngineState::Running {
            return Err(ProsodyError::InvalidInput(
                "cannot initialize while running".to_string(),
            ));
        }
        let label = context
            .acquire()
            .map_err(|err| ProsodyError::Initialization(format!("{:#}", err)))?;
        info!(context = %label, "capture context acquired");
        self.state = EngineState::Stopped;
        Ok(())
    }

    /// Begin consuming frames from `source`; returns its sample rate.
    pub fn start(&mut self, mut source: Box<dyn FrameSource>) -> Result<u32> {
        match self.state {
            EngineState::Uninitialized => return Err(ProsodyError::NotInitialized),
            EngineState::Running => {
                return Err(ProsodyError::InvalidInput(
                    "analyzer is already running".to_string(),
                ))
            }
            EngineState::Stopped => {}
        }
        let sample_rate = source.start()?;
        self.source = Some(source);
        self.state = EngineState::Running;
        info!(sample_rate, "frame intake started");
        Ok(sample_rate)
    }

    /// Extract features from one frame and append them to the histories.
    pub fn process_frame(&mut self, frame: &SampleFrame) -> Result<FrameFeatures> {
        match self.state {
            EngineState::Uninitialized => return Err(ProsodyError::NotInitialized),
            EngineState::Stopped => {
                return Err(ProsodyError::InvalidInput(
                    "analyzer is stopped".to_string(),
                ))
            }
            EngineState::Running => {}
        }
        let features = self.extractor.extract(frame)?;
        self.frames_processed += 1;
        if self.frames_processed.is_multiple_of(DEBUG_FRAME_INTERVAL) {
            debug!(
                frame = self.frames_processed,
                rms = features.rms,
                zcr = features.zcr,
                spectral_centroid = features.spectral_centroid,
                latest_pitch = ?self.extractor.latest_pitch(),
                timestamp = features.timestamp,
                "processed frame"
            );
        }
        Ok(features)
    }

    /// Pull at most one frame from the active source and process it.
    pub fn pump(&mut self) -> Result<PumpOutcome> {
        match self.state {
            EngineState::Uninitialized => return Err(ProsodyError::NotInitialized),
            EngineState::Stopped => return Ok(PumpOutcome::Stopped),
            EngineState::Running => {}
        }
        let source = self.source.as_mut().ok_or(ProsodyError::NotInitialized)?;
        let timeout = Duration::from_millis(FRAME_POLL_MS);
        let Some(frame) = source.next_frame(timeout) else {
            return Ok(if source.is_exhausted() {
                PumpOutcome::Exhausted
            } else {
                PumpOutcome::Idle
            });
        };
        match self.process_frame(&frame) {
            Ok(_) => Ok(PumpOutcome::Processed),
            Err(ProsodyError::InvalidInput(reason)) => {
                warn!(timestamp = frame.timestamp(), %reason, "skipping invalid frame");
                Ok(PumpOutcome::Skipped)
            }
            Err(err) => Err(err),
        }
    }

    /// Pump until the source runs dry; returns the number of frames processed.
    pub fn run_to_end(&mut self) -> Result<usize> {
        let before = self.frames_processed;
        loop {
            match self.pump()? {
                PumpOutcome::Exhausted | PumpOutcome::Stopped => break,
                PumpOutcome::Processed | PumpOutcome::Skipped | PumpOutcome::Idle => {}
            }
        }
        Ok(self.frames_processed - before)
    }

    /// Pump for at most `duration` of wall-clock time.
    pub fn run_for(&mut self, duration: Duration) -> Result<usize> {
        let before = self.frames_processed;
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            match self.pump()? {
                PumpOutcome::Exhausted | PumpOutcome::Stopped => break,
                PumpOutcome::Processed | PumpOutcome::Skipped | PumpOutcome::Idle => {}
            }
        }
        Ok(self.frames_processed - before)
    }

    /// Halt frame intake. Calling it again is a no-op.
    pub fn stop(&mut self) {
        if self.state != EngineState::Running {
            debug!("stop requested while not running");
            return;
        }
        if let Some(mut source) = self.source.take() {
            source.stop();
        }
        self.state = EngineState::Stopped;
        info!(frames = self.frames_processed, "frame intake stopped");
    }

    /// Clear all feature state. Only valid while not running.
    pub fn reset(&mut self) -> Result<()> {
        if self.state == EngineState::Running {
            return Err(ProsodyError::InvalidInput(
                "reset while running".to_string(),
            ));
        }
        self.extractor.clear();
        self.frames_processed = 0;
        info!("analyzer state cleared");
        Ok(())
    }

    pub fn feature_histories(&self) -> FeatureHistories {
        self.extractor.histories()
    }

    pub fn syllables(&self) -> Vec<Syllable> {
        let histories = self.extractor.histories();
        self.segmenter.segment(&histories.rms, &histories.pitch)
    }

    pub fn stress_analysis(&self) -> StressAnalysis {
        let histories = self.extractor.histories();
        let syllables = self.segmenter.segment(&histories.rms, &histories.pitch);
        self.scorer.stress_analysis(&syllables, &histories)
    }

    pub fn assessment(&self) -> PronunciationAssessment {
        self.report().assessment
    }

    /// Histories, syllables, stress view and assessment from one consistent snapshot.
    pub fn report(&self) -> FeatureReport {
        let histories = self.extractor.histories();
        let syllables = self.segmenter.segment(&histories.rms, &histories.pitch);
        let stress = self.scorer.stress_analysis(&syllables, &histories);
        let clarity = self.scorer.clarity_score(&histories.spectral_centroid);
        let assessment = self.aggregator.assess(&stress, clarity);
        FeatureReport {
            histories,
            syllables,
            stress,
            assessment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UnavailableContext;

    impl CaptureContext for UnavailableContext {
        fn acquire(&self) -> anyhow::Result<String> {
            anyhow::bail!("no audio subsystem")
        }
    }

    fn silent_frames(count: usize) -> Vec<SampleFrame> {
        (0..count)
            .map(|index| {
                SampleFrame::new(
                    vec![0.0; 256],
                    vec![f32::NEG_INFINITY; 128],
                    16_000,
                    index as f64 * 0.016,
                )
            })
            .collect()
    }

    fn running(frames: Vec<SampleFrame>) -> ProsodyAnalyzer {
        let mut analyzer = ProsodyAnalyzer::new(AnalyzerConfig::default()).unwrap();
        analyzer.initialize(&OfflineContext).unwrap();
        analyzer
            .start(Box::new(ClipSource::from_frames(16_000, frames)))
            .unwrap();
        analyzer
    }

    #[test]
    fn start_before_initialize_fails() {
        let mut analyzer = ProsodyAnalyzer::new(AnalyzerConfig::default()).unwrap();
        let err = analyzer
            .start(Box::new(ClipSource::from_frames(16_000, Vec::new())))
            .unwrap_err();
        assert_eq!(err, ProsodyError::NotInitialized);
        assert_eq!(analyzer.pump().unwrap_err(), ProsodyError::NotInitialized);
    }

    #[test]
    fn unavailable_context_fails_initialization() {
        let mut analyzer = ProsodyAnalyzer::new(AnalyzerConfig::default()).unwrap();
        let err = analyzer.initialize(&UnavailableContext).unwrap_err();
        assert!(matches!(err, ProsodyError::Initialization(_)));
        assert_eq!(analyzer.state(), EngineState::Uninitialized);
    }

    #[test]
    fn invalid_frames_are_skipped() {
        let mut frames = silent_frames(3);
        frames.insert(1, SampleFrame::new(Vec::new(), Vec::new(), 16_000, 0.01));
        let mut analyzer = running(frames);
        assert_eq!(analyzer.pump().unwrap(), PumpOutcome::Processed);
        assert_eq!(analyzer.pump().unwrap(), PumpOutcome::Skipped);
        assert_eq!(analyzer.run_to_end().unwrap(), 2);
        assert_eq!(analyzer.frames_processed(), 3);
    }

    #[test]
    fn rewinding_frames_are_skipped() {
        let mut frames = silent_frames(3);
        frames.swap(1, 2);
        let mut analyzer = running(frames);
        assert_eq!(analyzer.pump().unwrap(), PumpOutcome::Processed);
        assert_eq!(analyzer.pump().unwrap(), PumpOutcome::Processed);
        assert_eq!(analyzer.pump().unwrap(), PumpOutcome::Skipped);
        let timestamps: Vec<f64> = analyzer
            .feature_histories()
            .rms
            .iter()
            .map(|sample| sample.timestamp)
            .collect();
        assert_eq!(timestamps, vec![0.0, 2.0 * 0.016]);
    }

    #[test]
    fn stop_is_idempotent_and_halts_intake() {
        let mut analyzer = running(silent_frames(10));
        analyzer.pump().unwrap();
        analyzer.stop();
        analyzer.stop();
        assert_eq!(analyzer.state(), EngineState::Stopped);
        assert_eq!(analyzer.pump().unwrap(), PumpOutcome::Stopped);
        assert_eq!(analyzer.feature_histories().rms.len(), 1);
    }

    #[test]
    fn reset_requires_stopped_engine() {
        let mut analyzer = running(silent_frames(4));
        analyzer.run_to_end().unwrap();
        assert!(analyzer.reset().is_err());
        analyzer.stop();
        analyzer.reset().unwrap();
        assert!(analyzer.feature_histories().rms.is_empty());
        assert_eq!(analyzer.frames_processed(), 0);
    }

    #[test]
    fn processing_after_stop_is_rejected() {
        let mut analyzer = running(silent_frames(1));
        analyzer.stop();
        let frame = &silent_frames(1)[0];
        assert!(matches!(
            analyzer.process_frame(frame),
            Err(ProsodyError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_invalid_config() {
        let config = AnalyzerConfig {
            history_capacity: 0,
            ..AnalyzerConfig::default()
        };
        assert!(matches!(
            ProsodyAnalyzer::new(config),
            Err(ProsodyError::Config(_))
        ));
    }
}
