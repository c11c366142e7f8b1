use std::ops::RangeInclusive;
use std::path::PathBuf;

use anyhow::{ensure, Result};
use clap::{Args, Parser, Subcommand};

use crate::audio::capture::CaptureConfig;
use crate::audio::framer::{FramingConfig, DEFAULT_FRAME_SIZE};
use crate::config::AnalyzerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "prosody",
    version,
    about = "Prosodic pronunciation analysis: pitch, stress, rhythm, intonation and clarity"
)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a recorded audio file (WAV, FLAC, MP3, OGG, ...).
    Analyze(AnalyzeArgs),
    /// Capture from the microphone for a fixed time and analyze it.
    Live(LiveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// JSON file overriding analyzer constants.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Analysis window length in samples.
    #[arg(long = "frame-size", default_value_t = DEFAULT_FRAME_SIZE)]
    pub frame_size: usize,
    /// Samples between successive windows (defaults to half the frame size).
    #[arg(long = "hop-size")]
    pub hop_size: Option<usize>,
    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
    /// Include the raw feature histories in JSON output.
    #[arg(long, requires = "json")]
    pub histories: bool,
}

impl AnalysisArgs {
    pub fn framing(&self) -> Result<FramingConfig> {
        FramingConfig::new(self.frame_size, self.hop_size)
    }

    pub fn analyzer_config(&self) -> Result<AnalyzerConfig> {
        AnalyzerConfig::from_override(self.config.as_deref())
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Input audio file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Args, Debug, Clone)]
pub struct LiveArgs {
    /// Recording length in seconds.
    #[arg(long, default_value_t = 10.0)]
    pub seconds: f64,
    /// Optional input device name.
    #[arg(long)]
    pub device: Option<String>,
    /// Minimum latency in milliseconds for capture buffering.
    #[arg(long = "latency-min")]
    pub latency_min: Option<u32>,
    /// Maximum latency in milliseconds for capture buffering.
    #[arg(long = "latency-max")]
    pub latency_max: Option<u32>,
    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

impl LiveArgs {
    pub fn latency_range(&self) -> Result<RangeInclusive<u32>> {
        match (self.latency_min, self.latency_max) {
            (Some(min), Some(max)) => {
                ensure!(min > 0, "latency_min must be positive");
                ensure!(max >= min, "latency_max must be >= latency_min");
                Ok(min..=max)
            }
            (None, None) => Ok(100..=200),
            _ => anyhow::bail!("provide both latency-min and latency-max or neither"),
        }
    }

    pub fn capture_config(&self) -> Result<CaptureConfig> {
        ensure!(
            self.seconds.is_finite() && self.seconds > 0.0,
            "recording length must be positive, got {}",
            self.seconds
        );
        Ok(CaptureConfig {
            device_name: self.device.clone(),
            latency_ms: self.latency_range()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn analyze_defaults() {
        let cli = Cli::try_parse_from(["prosody", "analyze", "answer.wav"]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze command");
        };
        let framing = args.analysis.framing().unwrap();
        assert_eq!((framing.frame_size, framing.hop_size), (2048, 1024));
        assert!(!args.analysis.json);
        assert!(!cli.verbose);
    }

    #[test]
    fn histories_require_json() {
        assert!(Cli::try_parse_from(["prosody", "analyze", "a.wav", "--histories"]).is_err());
        assert!(
            Cli::try_parse_from(["prosody", "analyze", "a.wav", "--json", "--histories"]).is_ok()
        );
    }

    #[test]
    fn live_validates_latency_range() {
        let cli = Cli::try_parse_from([
            "prosody",
            "live",
            "--latency-min",
            "120",
            "--latency-max",
            "180",
        ])
        .unwrap();
        let Command::Live(args) = cli.command else {
            panic!("expected live command");
        };
        let range = args.latency_range().unwrap();
        assert_eq!((*range.start(), *range.end()), (120, 180));
        assert_eq!(args.seconds, 10.0);
    }

    #[test]
    fn live_rejects_partial_latency_override() {
        let cli = Cli::try_parse_from(["prosody", "live", "--latency-min", "150"]).unwrap();
        let Command::Live(args) = cli.command else {
            panic!("expected live command");
        };
        assert!(args.capture_config().is_err());
    }

    #[test]
    fn live_rejects_non_positive_duration() {
        let cli = Cli::try_parse_from(["prosody", "live", "--seconds", "0"]).unwrap();
        let Command::Live(args) = cli.command else {
            panic!("expected live command");
        };
        assert!(args.capture_config().is_err());
    }
}
