//! Per-source gain and summation.

use crate::chunk::AudioChunk;

/// Sums source chunks into one interleaved stream of fixed shape.
///
/// Each input is scaled by `volume / 100`. A missing input contributes
/// silence. Inputs shorter than the cycle are zero-padded, longer ones
/// truncated. No clipping happens here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioMixer {
    frames: usize,
    channels: u16,
}

impl AudioMixer {
    pub fn new(frames: usize, channels: u16) -> Self {
        Self {
            frames,
            channels: channels.max(1),
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Linear gain for a volume percentage, clamped to `[0, 100]`.
    pub fn gain(volume: u8) -> f32 {
        volume.min(100) as f32 / 100.0
    }

    /// Mix `(chunk, volume)` pairs into one chunk.
    pub fn mix<'a, I>(&self, inputs: I) -> AudioChunk
    where
        I: IntoIterator<Item = (Option<&'a AudioChunk>, u8)>,
    {
        let mut mixed = AudioChunk::silent(self.frames, self.channels);
        for (chunk, volume) in inputs {
            let Some(chunk) = chunk else {
                continue;
            };
            if chunk.channels() != self.channels {
                tracing::debug!(
                    expected = self.channels,
                    got = chunk.channels(),
                    "Skipping source chunk with mismatched channel count"
                );
                continue;
            }
            let gain = Self::gain(volume);
            if gain == 0.0 {
                continue;
            }
            for (out, &sample) in mixed.samples_mut().iter_mut().zip(chunk.samples()) {
                *out += sample * gain;
            }
        }
        mixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ramp(frames: usize) -> AudioChunk {
        let samples = (0..frames * 2).map(|i| (i as f32 / 100.0).sin() * 0.8).collect();
        AudioChunk::new(samples, 2)
    }

    #[test]
    fn muted_system_equals_mic_only() {
        let mixer = AudioMixer::new(256, 2);
        let system = ramp(256);
        let mic = AudioChunk::new(ramp(256).samples().iter().map(|s| -s * 0.5).collect(), 2);

        let both = mixer.mix([(Some(&system), 0), (Some(&mic), 100)]);
        let mic_only = mixer.mix([(None, 100), (Some(&mic), 100)]);
        assert_eq!(both, mic_only);
        assert_eq!(both.samples(), mic.samples());
    }

    #[test]
    fn missing_sources_are_silence() {
        let mixer = AudioMixer::new(64, 2);
        let mixed = mixer.mix([(None, 100), (None, 100)]);
        assert_eq!(mixed.frames(), 64);
        assert_eq!(mixed.peak(), 0.0);
    }

    #[test]
    fn short_inputs_are_padded_and_long_ones_truncated() {
        let mixer = AudioMixer::new(4, 2);
        let short = AudioChunk::new(vec![1.0; 4], 2);
        let long = AudioChunk::new(vec![0.5; 20], 2);
        let mixed = mixer.mix([(Some(&short), 100), (Some(&long), 100)]);
        assert_eq!(mixed.samples(), &[1.5, 1.5, 1.5, 1.5, 0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn sums_are_not_clipped() {
        let mixer = AudioMixer::new(1, 2);
        let loud = AudioChunk::new(vec![0.9, -0.9], 2);
        let mixed = mixer.mix([(Some(&loud), 100), (Some(&loud), 100)]);
        assert_eq!(mixed.samples(), &[1.8, -1.8]);
    }

    proptest! {
        #[test]
        fn single_source_scales_linearly(
            samples in prop::collection::vec(-1.0f32..1.0, 2..512),
            volume in 0u8..=100,
        ) {
            let chunk = AudioChunk::new(samples, 2);
            let mixer = AudioMixer::new(chunk.frames(), 2);
            let mixed = mixer.mix([(Some(&chunk), volume)]);
            let gain = volume as f32 / 100.0;
            for (out, input) in mixed.samples().iter().zip(chunk.samples()) {
                prop_assert!((out - input * gain).abs() <= 1e-6);
            }
        }
    }
}
