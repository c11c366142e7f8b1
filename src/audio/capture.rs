use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use tracing::{error, info};

const CHUNK_FRAMES: u64 = 1024;

#[derive(Clone, Debug)]
pub struct CaptureConfig {
    pub device_name: Option<String>,
    pub latency_ms: RangeInclusive<u32>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            latency_ms: 100..=200,
        }
    }
}

/// Microphone stream delivering mono chunks at the device's native rate.
pub struct LiveCapture {
    stream: Stream,
    receiver: Receiver<Vec<f32>>,
    finished: Arc<AtomicBool>,
    sample_rate: u32,
}

impl LiveCapture {
    pub fn start(config: &CaptureConfig) -> Result<Self> {
        let device = select_device(config.device_name.as_deref())?;
        let supported = device
            .default_input_config()
            .context("failed to query default input config")?;
        let stream_config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: BufferSize::Default,
        };
        let capacity = channel_capacity(stream_config.sample_rate.0, &config.latency_ms);
        let (sender, receiver) = mpsc::sync_channel::<Vec<f32>>(capacity);
        let finished = Arc::new(AtomicBool::new(false));
        let format = supported.sample_format();
        let stream = match format {
            SampleFormat::F32 => build_input_stream::<f32>(&device, &stream_config, sender, &finished),
            SampleFormat::I16 => build_input_stream::<i16>(&device, &stream_config, sender, &finished),
            SampleFormat::U16 => build_input_stream::<u16>(&device, &stream_config, sender, &finished),
            other => Err(anyhow!("unsupported input sample format {:?}", other)),
        }
        .with_context(|| format!("failed to open {:?} input stream", format))?;
        info!(
            sample_rate = stream_config.sample_rate.0,
            channels = stream_config.channels,
            "live capture stream started"
        );
        stream
            .play()
            .context("failed to start live capture stream")?;
        Ok(Self {
            stream,
            receiver,
            finished,
            sample_rate: stream_config.sample_rate.0,
        })
    }

    pub fn recv_chunk(&self, timeout: Duration) -> Option<Vec<f32>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(chunk) => Some(chunk),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn stop(&self) {
        self.finished.store(true, Ordering::SeqCst);
        let _ = self.stream.pause();
    }
}

impl Drop for LiveCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Check that an input device can be opened without starting a stream.
pub fn probe_input(device_name: Option<&str>) -> Result<String> {
    let device = select_device(device_name)?;
    device
        .default_input_config()
        .context("input device has no usable configuration")?;
    Ok(device.name().unwrap_or_else(|_| "unknown".to_string()))
}

fn select_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for device in host
            .input_devices()
            .context("listing input devices failed")?
        {
            if device.name().map(|n| n == name).unwrap_or(false) {
                return Ok(device);
            }
        }
        return Err(anyhow!("input device '{}' not found", name));
    }
    host.default_input_device()
        .context("no default input device available")
}

fn build_input_stream<T>(
    device: &Device,
    config: &StreamConfig,
    sender: SyncSender<Vec<f32>>,
    finished: &Arc<AtomicBool>,
) -> Result<Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    let finished = finished.clone();
    let mut converted = Vec::with_capacity(channels);
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if finished.load(Ordering::Relaxed) || channels == 0 {
                    return;
                }
                let _ = sender.try_send(downmix(data, channels, &mut converted));
            },
            |err| error!(error = %err, "audio input stream error"),
            None,
        )
        .context("failed to build input stream")
}

fn channel_capacity(sample_rate: u32, latency_ms: &RangeInclusive<u32>) -> usize {
    let max_latency = (*latency_ms.end()).max(*latency_ms.start());
    let frames = (sample_rate as u64 * max_latency as u64) / 1000;
    (frames / CHUNK_FRAMES).max(2) as usize
}

/// Convert interleaved device samples to f32 and average each frame to mono.
fn downmix<T>(data: &[T], channels: usize, converted: &mut Vec<f32>) -> Vec<f32>
where
    T: Sample,
    f32: FromSample<T>,
{
    data.chunks(channels)
        .map(|frame| {
            converted.clear();
            converted.extend(frame.iter().map(|&s| s.to_sample::<f32>()));
            mix_to_mono(converted.as_slice())
        })
        .collect()
}

pub fn mix_to_mono(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().sum::<f32>() / frame.len() as f32
}
