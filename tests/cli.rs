use std::f32::consts::PI;
use std::path::Path;

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const SAMPLE_RATE: u32 = 16_000;

fn write_voiced_wav(path: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for index in 0..SAMPLE_RATE as usize {
        let t = index as f32 / SAMPLE_RATE as f32;
        let envelope = if (t * 4.0).fract() < 0.5 { 0.4 } else { 0.01 };
        let sample = envelope * (2.0 * PI * 180.0 * t).sin();
        writer.write_sample((sample * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[test]
fn analyze_prints_json_assessment() -> Result<()> {
    let dir = tempdir()?;
    let wav = dir.path().join("answer.wav");
    write_voiced_wav(&wav)?;

    Command::cargo_bin("prosody")?
        .arg("analyze")
        .arg(&wav)
        .arg("--json")
        .args(["--frame-size", "512"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"overall\""))
        .stdout(predicate::str::contains("\"syllables\""));
    Ok(())
}

#[test]
fn analyze_prints_table_by_default() -> Result<()> {
    let dir = tempdir()?;
    let wav = dir.path().join("answer.wav");
    write_voiced_wav(&wav)?;

    Command::cargo_bin("prosody")?
        .arg("analyze")
        .arg(&wav)
        .assert()
        .success()
        .stdout(predicate::str::contains("Overall pronunciation"))
        .stdout(predicate::str::contains("Stress pattern"));
    Ok(())
}

#[test]
fn analyze_missing_file_fails() -> Result<()> {
    let dir = tempdir()?;
    Command::cargo_bin("prosody")?
        .args(["analyze"])
        .arg(dir.path().join("absent.wav"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load"));
    Ok(())
}

#[test]
fn rejects_hop_larger_than_frame() -> Result<()> {
    let dir = tempdir()?;
    let wav = dir.path().join("answer.wav");
    write_voiced_wav(&wav)?;

    Command::cargo_bin("prosody")?
        .arg("analyze")
        .arg(&wav)
        .args(["--frame-size", "256", "--hop-size", "512"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hop size"));
    Ok(())
}
