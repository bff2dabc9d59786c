//! Speech-oriented noise reduction.
//!
//! Per channel, each chunk runs through:
//!
//! 1. A 6th-order Butterworth band-pass over the speech band (300-3400 Hz)
//! 2. An adaptive soft gate over overlapping frames, cross-faded together
//! 3. A strength blend between the filtered and gated signals
//! 4. Soft-knee compression against the chunk's own RMS
//!
//! followed by makeup gain and a hard ceiling. Filter state starts from
//! zero on every chunk.

use recast_common::error::{RecastError, RecastResult};

use crate::chunk::AudioChunk;
use crate::filter::BandPass;

/// Chunks shorter than this (in frames) pass through unchanged.
pub const MIN_FRAMES: usize = 2048;

const BAND_ORDER: usize = 6;
const BAND_LOW_HZ: f64 = 300.0;
const BAND_HIGH_HZ: f64 = 3400.0;

const GATE_FRAME: usize = 512;
const GATE_HOP: usize = GATE_FRAME / 4;
const GATE_THRESHOLD_SCALE: f64 = 0.1;
const GATE_SLOPE: f64 = 10.0;

/// Full strength never replaces more than this share of the signal.
const STRENGTH_SCALE: f64 = 0.8;

const COMP_THRESHOLD_SCALE: f64 = 1.5;
const COMP_KNEE_FRACTION: f64 = 0.3;
const COMP_RATIO: f64 = 2.0;

const MAKEUP_GAIN: f64 = 1.2;

/// Output ceiling after makeup gain.
pub const CEILING: f64 = 0.95;

/// Result of running one chunk through the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduced {
    Processed(AudioChunk),
    /// Too short to process; returned unchanged.
    Short(AudioChunk),
    /// Processing failed; the unprocessed chunk is returned.
    PassedThrough(AudioChunk),
}

impl Reduced {
    pub fn into_chunk(self) -> AudioChunk {
        match self {
            Reduced::Processed(c) | Reduced::Short(c) | Reduced::PassedThrough(c) => c,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, Reduced::PassedThrough(_))
    }
}

/// Band-pass, soft gate, and compressor chain.
#[derive(Debug, Clone)]
pub struct NoiseReducer {
    band: BandPass,
    strength: f64,
    crossfade: Vec<f64>,
}

impl NoiseReducer {
    /// Build a reducer for `sample_rate` with `strength` in `[0, 1]`.
    pub fn new(strength: f32, sample_rate: u32) -> RecastResult<Self> {
        let band = BandPass::butterworth(BAND_ORDER, BAND_LOW_HZ, BAND_HIGH_HZ, sample_rate as f64)?;
        let strength = if strength.is_finite() {
            strength.clamp(0.0, 1.0) as f64
        } else {
            0.0
        };
        Ok(Self {
            band,
            strength,
            crossfade: crossfade_window(),
        })
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// Process `chunk`, falling back to the raw chunk on failure.
    pub fn reduce(&self, chunk: AudioChunk) -> Reduced {
        if chunk.frames() < MIN_FRAMES {
            return Reduced::Short(chunk);
        }
        match self.process(&chunk) {
            Ok(processed) => Reduced::Processed(processed),
            Err(e) => {
                tracing::debug!(error = %e, "Noise reduction failed; passing chunk through");
                Reduced::PassedThrough(chunk)
            }
        }
    }

    /// Process `chunk`. Short chunks are returned unchanged.
    pub fn process(&self, chunk: &AudioChunk) -> RecastResult<AudioChunk> {
        if chunk.frames() < MIN_FRAMES {
            return Ok(chunk.clone());
        }

        let blend = self.strength * STRENGTH_SCALE;
        let mut out = chunk.clone();
        for channel in 0..chunk.channels() as usize {
            let filtered = self.band.apply(&chunk.channel(channel));
            let gated = self.soft_gate(&filtered);
            let enhanced: Vec<f64> = filtered
                .iter()
                .zip(&gated)
                .map(|(f, g)| f * (1.0 - blend) + g * blend)
                .collect();
            let mut shaped = compress(&enhanced);
            for sample in &mut shaped {
                *sample = (*sample * MAKEUP_GAIN).clamp(-CEILING, CEILING);
            }
            out.set_channel(channel, &shaped);
        }

        if !out.is_finite() {
            return Err(RecastError::dsp("noise reduction produced non-finite samples"));
        }
        Ok(out)
    }

    /// Overlapping-frame soft gate. Samples past the last whole frame stay
    /// at zero.
    fn soft_gate(&self, signal: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; signal.len()];
        if signal.len() < GATE_FRAME {
            return out;
        }
        let frames = 1 + (signal.len() - GATE_FRAME) / GATE_HOP;
        for index in 0..frames {
            let start = index * GATE_HOP;
            let frame = &signal[start..start + GATE_FRAME];
            let energy = frame.iter().map(|x| x * x).sum::<f64>() / GATE_FRAME as f64;
            let threshold = energy.sqrt() * GATE_THRESHOLD_SCALE;

            let target = &mut out[start..start + GATE_FRAME];
            for ((slot, &x), &w) in target.iter_mut().zip(frame).zip(&self.crossfade) {
                let gain = 1.0 / (1.0 + (-(x.abs() - threshold) * GATE_SLOPE).exp());
                let gated = x * gain;
                *slot = if index == 0 {
                    gated
                } else {
                    *slot * (1.0 - w) + gated * w
                };
            }
        }
        out
    }
}

/// Fade in over one hop, fade out over the rest of the frame.
fn crossfade_window() -> Vec<f64> {
    let fade_out_len = GATE_FRAME - GATE_HOP;
    let fade_in = (0..GATE_HOP).map(|i| i as f64 / (GATE_HOP - 1) as f64);
    let fade_out = (0..fade_out_len).map(|i| 1.0 - i as f64 / (fade_out_len - 1) as f64);
    fade_in.chain(fade_out).collect()
}

/// Soft-knee compression against the signal's own RMS.
fn compress(signal: &[f64]) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let rms = (signal.iter().map(|x| x * x).sum::<f64>() / signal.len() as f64).sqrt();
    let threshold = rms * COMP_THRESHOLD_SCALE;
    let knee = threshold * COMP_KNEE_FRACTION;
    let knee_start = threshold - knee;
    let knee_end = threshold + knee;

    signal
        .iter()
        .map(|&x| {
            let magnitude = x.abs();
            let gain = if magnitude == 0.0 {
                1.0
            } else if magnitude >= knee_end {
                (threshold + (magnitude - threshold) / COMP_RATIO) / magnitude
            } else if magnitude > knee_start {
                let t = (magnitude - knee_start) / (2.0 * knee);
                1.0 - (1.0 - 1.0 / COMP_RATIO) * t * t
            } else {
                1.0
            };
            x * gain
        })
        .collect()
}
