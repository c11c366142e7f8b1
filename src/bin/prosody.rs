use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use prosodyzer::audio::decoder::decode_audio;
use prosodyzer::prosody::cli::{AnalysisArgs, AnalyzeArgs, Cli, Command, LiveArgs};
use prosodyzer::prosody::{
    ClipSource, FeatureReport, InputDeviceContext, LiveFrameSource, OfflineContext,
    ProsodyAnalyzer,
};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Analyze(args) => handle_analyze(&args),
        Command::Live(args) => handle_live(&args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_analyze(args: &AnalyzeArgs) -> Result<()> {
    let config = args.analysis.analyzer_config()?;
    let framing = args.analysis.framing()?;
    let audio = decode_audio(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    info!(
        path = %args.input.display(),
        duration_secs = audio.duration_secs(),
        sample_rate = audio.sample_rate,
        "analyzing recording"
    );

    let mut analyzer = ProsodyAnalyzer::new(config)?;
    analyzer.initialize(&OfflineContext)?;
    analyzer.start(Box::new(ClipSource::from_audio(&audio, framing)))?;
    let frames = analyzer.run_to_end()?;
    analyzer.stop();
    info!(frames, "analysis complete");
    print_report(&analyzer.report(), &args.analysis)
}

fn handle_live(args: &LiveArgs) -> Result<()> {
    let config = args.analysis.analyzer_config()?;
    let framing = args.analysis.framing()?;
    let capture = args.capture_config()?;

    let mut analyzer = ProsodyAnalyzer::new(config)?;
    analyzer.initialize(&InputDeviceContext {
        device_name: capture.device_name.clone(),
    })?;
    analyzer.start(Box::new(LiveFrameSource::new(capture, framing)))?;
    info!(seconds = args.seconds, "recording; speak now");
    let frames = analyzer.run_for(Duration::from_secs_f64(args.seconds))?;
    analyzer.stop();
    info!(frames, "recording finished");
    print_report(&analyzer.report(), &args.analysis)
}

fn print_report(report: &FeatureReport, args: &AnalysisArgs) -> Result<()> {
    if args.json {
        let rendered = if args.histories {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string_pretty(&json!({
                "assessment": report.assessment,
                "stress": report.stress,
                "syllables": report.syllables,
            }))?
        };
        println!("{}", rendered);
        return Ok(());
    }

    let assessment = &report.assessment;
    println!("Syllables detected:     {}", report.syllables.len());
    println!("Stress pattern:         {}", report.stress.pattern_string());
    println!("Pitch frames:           {}", report.histories.pitch.len());
    println!("Stress accuracy:        {:.2}", assessment.stress_accuracy);
    println!("Intonation naturalness: {:.2}", assessment.intonation_naturalness);
    println!("Rhythm fluency:         {:.2}", assessment.rhythm_fluency);
    println!("Pronunciation clarity:  {:.2}", assessment.pronunciation_clarity);
    println!("Overall pronunciation:  {:.2}", assessment.overall);
    Ok(())
}
