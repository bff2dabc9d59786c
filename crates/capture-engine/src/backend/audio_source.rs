//! Audio inputs through `cpal`.
//!
//! The device callback converts whatever the device delivers into stereo
//! `f32` at the session rate and pushes it into a bounded channel. The audio
//! path pulls fixed-size chunks out of that channel with a bounded wait.
//! A full channel drops the newest block rather than stalling the device.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, StreamConfig, SupportedStreamConfig};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use recast_audio_dsp::AudioChunk;
use recast_common::error::{RecastError, RecastResult};
use recast_session_model::{AudioSourceKind, CHANNELS, SAMPLE_RATE};

use super::AudioSource;
use crate::control::SessionControl;

/// Device blocks buffered between the callback and the audio path.
const CHANNEL_CAPACITY: usize = 256;

/// Name fragments of input devices that capture system output.
const LOOPBACK_HINTS: [&str; 5] = ["monitor", "loopback", "stereo mix", "what u hear", "blackhole"];

/// An audio input device as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub is_loopback: bool,
}

/// List input devices on the default host.
pub fn list_input_devices() -> RecastResult<Vec<InputDeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());
    let devices = host
        .input_devices()
        .map_err(|e| RecastError::device(format!("Failed to enumerate input devices: {e}")))?;
    Ok(devices
        .filter_map(|device| device.name().ok())
        .map(|name| InputDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            is_loopback: looks_like_loopback(&name),
            name,
        })
        .collect())
}

/// Whether a device name suggests it records what the system plays.
pub fn looks_like_loopback(name: &str) -> bool {
    let name = name.to_lowercase();
    LOOPBACK_HINTS.iter().any(|hint| name.contains(hint))
}

/// One open cpal input stream.
pub struct CpalSource {
    kind: AudioSourceKind,
    name: String,
    rx: Receiver<Vec<f32>>,
    pending: VecDeque<f32>,
    _stream: cpal::Stream,
}

impl CpalSource {
    /// Open and start the device for `kind`.
    pub fn open(kind: AudioSourceKind, control: Arc<SessionControl>) -> RecastResult<Self> {
        let host = cpal::default_host();
        let (device, supported) = select_device(&host, kind)?;
        let name = device.name().unwrap_or_else(|_| "Unknown device".to_string());

        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();
        tracing::info!(
            source = %kind,
            device = %name,
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            ?sample_format,
            "Opening audio source"
        );

        let (tx, rx) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, tx, control, kind),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, tx, control, kind),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, tx, control, kind),
            other => Err(RecastError::device(format!(
                "Unsupported sample format {other:?} on {name}"
            ))),
        }?;
        stream
            .play()
            .map_err(|e| RecastError::device(format!("Failed to start {name}: {e}")))?;

        Ok(Self {
            kind,
            name,
            rx,
            pending: VecDeque::new(),
            _stream: stream,
        })
    }
}

impl AudioSource for CpalSource {
    fn kind(&self) -> AudioSourceKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, frames: usize, timeout: Duration) -> RecastResult<AudioChunk> {
        let needed = frames * CHANNELS as usize;
        let deadline = Instant::now() + timeout;
        while self.pending.len() < needed {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(block) => self.pending.extend(block),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(RecastError::device(format!(
                        "{} delivered {} of {} samples in time",
                        self.name,
                        self.pending.len(),
                        needed
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(RecastError::device(format!("{} stream closed", self.name)));
                }
            }
        }
        let samples: Vec<f32> = self.pending.drain(..needed).collect();
        Ok(AudioChunk::new(samples, CHANNELS))
    }
}

fn select_device(
    host: &cpal::Host,
    kind: AudioSourceKind,
) -> RecastResult<(Device, SupportedStreamConfig)> {
    match kind {
        AudioSourceKind::Microphone => {
            let device = host
                .default_input_device()
                .ok_or_else(|| RecastError::device("No microphone available"))?;
            let config = input_config(&device)?;
            Ok((device, config))
        }
        AudioSourceKind::System => {
            let monitor = host
                .input_devices()
                .map_err(|e| RecastError::device(format!("Failed to enumerate input devices: {e}")))?
                .find(|d| d.name().map(|n| looks_like_loopback(&n)).unwrap_or(false));
            if let Some(device) = monitor {
                let config = input_config(&device)?;
                return Ok((device, config));
            }
            // WASAPI exposes loopback as an input stream on the output device.
            let device = host
                .default_output_device()
                .ok_or_else(|| RecastError::device("No loopback or output device available"))?;
            let config = device.default_output_config().map_err(|e| {
                RecastError::device(format!("Failed to get output config: {e}"))
            })?;
            Ok((device, config))
        }
    }
}

/// Prefer a configuration at the session rate; otherwise the device default,
/// resampled in the callback.
fn input_config(device: &Device) -> RecastResult<SupportedStreamConfig> {
    let default = device
        .default_input_config()
        .map_err(|e| RecastError::device(format!("Failed to get input config: {e}")))?;
    if default.sample_rate().0 == SAMPLE_RATE {
        return Ok(default);
    }
    let target = cpal::SampleRate(SAMPLE_RATE);
    let native = device.supported_input_configs().ok().and_then(|mut ranges| {
        ranges.find(|r| {
            r.sample_format() == default.sample_format()
                && r.min_sample_rate() <= target
                && target <= r.max_sample_rate()
        })
    });
    Ok(native
        .map(|range| range.with_sample_rate(target))
        .unwrap_or(default))
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    tx: Sender<Vec<f32>>,
    control: Arc<SessionControl>,
    kind: AudioSourceKind,
) -> RecastResult<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let mut resampler = Resampler::new(config.sample_rate.0, SAMPLE_RATE);
    let mut stereo = Vec::new();
    let mut dropped: u64 = 0;

    let data_callback = move |data: &[T], _: &cpal::InputCallbackInfo| {
        if !control.is_recording() {
            return;
        }
        stereo.clear();
        stereo.extend(data.chunks_exact(channels).map(|frame| {
            let left = f32::from_sample(frame[0]);
            let right = frame.get(1).map(|&s| f32::from_sample(s)).unwrap_or(left);
            [left, right]
        }));
        let mut block = Vec::with_capacity(stereo.len() * 2 + 4);
        resampler.push(&stereo, &mut block);
        if tx.try_send(block).is_err() {
            dropped += 1;
            if dropped == 1 || dropped % 100 == 0 {
                tracing::warn!(source = %kind, dropped, "Audio buffer full; dropping device data");
            }
        }
    };
    let err_fn = move |err: cpal::StreamError| {
        tracing::error!(source = %kind, error = %err, "Audio stream error");
    };

    device
        .build_input_stream(config, data_callback, err_fn, None)
        .map_err(|e| RecastError::device(format!("Failed to build {kind} stream: {e}")))
}

/// Streaming linear resampler for stereo frames.
///
/// Output frame `k` sits at input position `k * in_rate / out_rate`. The
/// last input frame of each block is carried over so interpolation is
/// continuous across callbacks.
#[derive(Debug, Clone)]
pub(crate) struct Resampler {
    step: f64,
    pos: f64,
    prev: Option<[f32; 2]>,
}

impl Resampler {
    pub fn new(in_rate: u32, out_rate: u32) -> Self {
        Self {
            step: in_rate.max(1) as f64 / out_rate.max(1) as f64,
            pos: 0.0,
            prev: None,
        }
    }

    /// Append the resampled form of `input` to `out` as interleaved samples.
    pub fn push(&mut self, input: &[[f32; 2]], out: &mut Vec<f32>) {
        let (prev, frames) = match self.prev {
            Some(prev) => (prev, input),
            None => match input.split_first() {
                Some((first, rest)) => (*first, rest),
                None => return,
            },
        };

        let n = frames.len() as f64;
        let mut t = self.pos;
        while t < n {
            let i = t as usize;
            let frac = (t - i as f64) as f32;
            let a = if i == 0 { prev } else { frames[i - 1] };
            let b = frames[i];
            out.push(a[0] + (b[0] - a[0]) * frac);
            out.push(a[1] + (b[1] - a[1]) * frac);
            t += self.step;
        }
        self.pos = t - n;
        self.prev = Some(frames.last().copied().unwrap_or(prev));
    }
}
