//! Interleaved audio sample blocks.

use recast_session_model::{CHANNELS, CHUNK_FRAMES};

/// A block of interleaved `f32` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    samples: Vec<f32>,
    channels: u16,
}

impl AudioChunk {
    /// Wrap interleaved samples. A trailing partial frame is dropped.
    pub fn new(mut samples: Vec<f32>, channels: u16) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);
        Self { samples, channels }
    }

    /// `frames` frames of silence.
    pub fn silent(frames: usize, channels: u16) -> Self {
        let channels = channels.max(1);
        Self {
            samples: vec![0.0; frames * channels as usize],
            channels,
        }
    }

    /// One standard mixing-cycle chunk of stereo silence.
    pub fn silent_cycle() -> Self {
        Self::silent(CHUNK_FRAMES, CHANNELS)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Copy one channel out, widened to `f64`.
    pub fn channel(&self, index: usize) -> Vec<f64> {
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels as usize)
            .map(|&s| s as f64)
            .collect()
    }

    /// Overwrite one channel from `data` (extra values are ignored).
    pub fn set_channel(&mut self, index: usize, data: &[f64]) {
        let stride = self.channels as usize;
        for (slot, &value) in self.samples.iter_mut().skip(index).step_by(stride).zip(data) {
            *slot = value as f32;
        }
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Whether every sample is finite.
    pub fn is_finite(&self) -> bool {
        self.samples.iter().all(|s| s.is_finite())
    }
}
