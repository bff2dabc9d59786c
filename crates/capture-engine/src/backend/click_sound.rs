//! Short synthesized click on the default output device.
//!
//! `click()` only posts to a worker thread, which opens an output stream
//! per click and lets it play out. A busy worker drops extra clicks.

use std::f32::consts::TAU;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use recast_common::error::{RecastError, RecastResult};
use recast_render_engine::ClickFeedback;

const CLICK_HZ: f32 = 1_800.0;
const CLICK_LENGTH: Duration = Duration::from_millis(40);
const CLICK_GAIN: f32 = 0.4;
/// Extra time the stream stays open after the samples run out.
const CLICK_TAIL: Duration = Duration::from_millis(30);

pub struct ClickSound {
    tx: Sender<()>,
}

impl ClickSound {
    /// Start the worker thread. `None` if the thread cannot be spawned.
    pub fn start() -> Option<Self> {
        let (tx, rx) = crossbeam_channel::bounded(2);
        match thread::Builder::new()
            .name("recast-click".to_string())
            .spawn(move || worker(rx))
        {
            Ok(_) => Some(Self { tx }),
            Err(e) => {
                tracing::warn!(error = %e, "Click sound unavailable");
                None
            }
        }
    }
}

impl ClickFeedback for ClickSound {
    fn click(&mut self) {
        let _ = self.tx.try_send(());
    }
}

fn worker(rx: Receiver<()>) {
    let mut failures: u64 = 0;
    while rx.recv().is_ok() {
        if let Err(e) = play_click() {
            failures += 1;
            if failures == 1 || failures % 50 == 0 {
                tracing::warn!(error = %e, failures, "Click sound failed");
            }
        }
    }
}

fn play_click() -> RecastResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| RecastError::device("No output device for click sound"))?;
    let supported = device
        .default_output_config()
        .map_err(|e| RecastError::device(format!("Failed to get output config: {e}")))?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();
    let samples = click_samples(config.sample_rate.0);

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, samples),
        SampleFormat::I16 => build_stream::<i16>(&device, &config, samples),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, samples),
        other => Err(RecastError::device(format!(
            "Unsupported output sample format {other:?}"
        ))),
    }?;
    stream
        .play()
        .map_err(|e| RecastError::device(format!("Failed to play click: {e}")))?;
    thread::sleep(CLICK_LENGTH + CLICK_TAIL);
    Ok(())
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    samples: Vec<f32>,
) -> RecastResult<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let mut cursor = 0usize;
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let value = samples.get(cursor).copied().unwrap_or(0.0);
                    cursor += 1;
                    for slot in frame {
                        *slot = T::from_sample(value);
                    }
                }
            },
            |err| tracing::debug!(error = %err, "Click stream error"),
            None,
        )
        .map_err(|e| RecastError::device(format!("Failed to open click stream: {e}")))
}

/// Mono click: an exponentially decaying sine burst.
pub(crate) fn click_samples(sample_rate: u32) -> Vec<f32> {
    let rate = sample_rate.max(1) as f32;
    let len = (sample_rate as u128 * CLICK_LENGTH.as_millis() / 1000) as usize;
    let decay = 5.0 / len.max(1) as f32;
    (0..len)
        .map(|i| {
            let t = i as f32 / rate;
            CLICK_GAIN * (-(i as f32) * decay).exp() * (TAU * CLICK_HZ * t).sin()
        })
        .collect()
}
