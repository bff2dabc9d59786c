//! Intermediate WAV writer.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use recast_audio_dsp::AudioChunk;
use recast_common::error::{RecastError, RecastResult};
use recast_session_model::{CHANNELS, SAMPLE_RATE};

use super::AudioSink;

/// 16-bit PCM stereo at the session sample rate.
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    path: PathBuf,
    frames: u64,
}

impl WavSink {
    pub fn create(path: &Path) -> RecastResult<Self> {
        let spec = WavSpec {
            channels: CHANNELS,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path, spec).map_err(|e| {
            RecastError::encode(format!("Failed to create {}: {e}", path.display()))
        })?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            frames: 0,
        })
    }
}

impl AudioSink for WavSink {
    fn write(&mut self, chunk: &AudioChunk) -> RecastResult<()> {
        if chunk.channels() != CHANNELS {
            return Err(RecastError::encode(format!(
                "Expected {CHANNELS}-channel audio, got {}",
                chunk.channels()
            )));
        }
        for &sample in chunk.samples() {
            self.writer
                .write_sample(quantize(sample))
                .map_err(|e| RecastError::encode(format!("Failed to write audio: {e}")))?;
        }
        self.frames += chunk.frames() as u64;
        Ok(())
    }

    fn finish(self: Box<Self>) -> RecastResult<()> {
        let Self {
            writer,
            path,
            frames,
        } = *self;
        writer
            .finalize()
            .map_err(|e| RecastError::encode(format!("Failed to finalize {}: {e}", path.display())))?;
        tracing::info!(
            path = %path.display(),
            frames,
            duration_secs = frames as f64 / SAMPLE_RATE as f64,
            "Audio sink finished"
        );
        Ok(())
    }
}

/// Float sample to 16-bit PCM, clamping to full scale.
pub fn quantize(sample: f32) -> i16 {
    if !sample.is_finite() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantizer_clamps_to_full_scale() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), i16::MAX);
        assert_eq!(quantize(3.5), i16::MAX);
        assert_eq!(quantize(-3.5), -i16::MAX);
        assert_eq!(quantize(0.5), 16384);
        assert_eq!(quantize(f32::NAN), 0);
    }

    #[test]
    fn written_file_is_stereo_pcm_at_session_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.wav");
        let mut sink: Box<dyn AudioSink> = Box::new(WavSink::create(&path).unwrap());
        sink.write(&AudioChunk::new(vec![0.25, -0.25, 2.0, -2.0], 2))
            .unwrap();
        sink.write(&AudioChunk::silent(10, 2)).unwrap();
        sink.finish().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 24);
        assert_eq!(&samples[..4], &[8192, -8192, i16::MAX, -i16::MAX]);
    }

    #[test]
    fn mono_chunks_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = WavSink::create(&dir.path().join("audio.wav")).unwrap();
        assert!(sink.write(&AudioChunk::new(vec![0.1; 8], 1)).is_err());
    }
}
