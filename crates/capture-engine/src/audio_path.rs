//! The audio path: read, mix, denoise, write, one chunk per cycle.
//!
//! Cycles are paced by the active clock: a chunk is read once the session
//! has been recording long enough to have produced it. Mute sessions and
//! sessions whose devices all failed run the same loop with no sources and
//! write silence at the same pace.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use recast_audio_dsp::{AudioChunk, AudioMixer, NoiseReducer, Reduced};
use recast_common::error::{ErrorKind, FailurePolicy, RecastResult};
use recast_session_model::{AudioSourceKind, CHANNELS, CHUNK_FRAMES, SAMPLE_RATE};

use crate::backend::{AudioSink, AudioSource, CaptureBackend};
use crate::control::{SessionControl, SessionState};
use crate::session::{wait_for_start, CapturePath, IntermediatePaths, SessionConfig, SessionFault};
use crate::stats::StatsCounters;

/// Longest sleep between checks of the control state.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) struct AudioPath {
    pub config: Arc<SessionConfig>,
    pub backend: Arc<dyn CaptureBackend>,
    pub control: Arc<SessionControl>,
    pub stats: Arc<StatsCounters>,
    pub paths: IntermediatePaths,
}

struct Cycle {
    sources: Vec<Box<dyn AudioSource>>,
    reducer: Option<NoiseReducer>,
    read_failures: u64,
    /// Sources dropped mid-session, surfaced when the path ends.
    dropped: Vec<SessionFault>,
}

impl AudioPath {
    pub fn run(self, ready: Sender<(CapturePath, RecastResult<()>)>) -> Vec<SessionFault> {
        let mut sink = match self.backend.open_audio_sink(&self.paths.audio) {
            Ok(sink) => sink,
            Err(e) => {
                let _ = ready.send((CapturePath::Audio, Err(e)));
                return Vec::new();
            }
        };

        let mut faults = Vec::new();
        let mut cycle = Cycle {
            sources: self.open_sources(&mut faults),
            reducer: self.noise_reducer(),
            read_failures: 0,
            dropped: Vec::new(),
        };
        let _ = ready.send((CapturePath::Audio, Ok(())));

        if !wait_for_start(&self.control) {
            let _ = sink.finish();
            return faults;
        }
        tracing::info!(
            mode = %self.config.audio_mode,
            sources = cycle.sources.len(),
            noise_reduction = cycle.reducer.is_some(),
            "Audio path started"
        );

        let mut written: u64 = 0;
        let mut healthy = true;
        loop {
            match self.control.state() {
                SessionState::Recording => {}
                SessionState::Paused | SessionState::Idle => {
                    std::thread::sleep(POLL_INTERVAL);
                    continue;
                }
                SessionState::Stopping | SessionState::Stopped => break,
            }

            let due = frames_due(self.control.active_elapsed());
            if due < written + CHUNK_FRAMES as u64 {
                let wait = frames_to_duration(written + CHUNK_FRAMES as u64 - due);
                std::thread::sleep(wait.min(POLL_INTERVAL));
                continue;
            }

            let chunk = self.mix_cycle(&mut cycle, CHUNK_FRAMES);
            if let Err(e) = sink.write(&chunk) {
                tracing::error!(error = %e, "Audio sink failed; stopping audio path");
                faults.push(SessionFault::from_error(&e));
                healthy = false;
                break;
            }
            written += chunk.frames() as u64;
            StatsCounters::bump(&self.stats.chunks_written);
        }

        // Cover the active time recorded since the last whole chunk.
        let due = frames_due(self.control.active_elapsed());
        if healthy && due > written {
            let tail = self.mix_cycle(&mut cycle, (due - written) as usize);
            match sink.write(&tail) {
                Ok(()) => StatsCounters::bump(&self.stats.chunks_written),
                Err(e) => faults.push(SessionFault::from_error(&e)),
            }
        }

        if let Err(e) = sink.finish() {
            tracing::error!(error = %e, "Failed to finalize intermediate audio");
            faults.push(SessionFault::from_error(&e));
        }
        faults.append(&mut cycle.dropped);
        faults
    }

    fn open_sources(&self, faults: &mut Vec<SessionFault>) -> Vec<Box<dyn AudioSource>> {
        let mode = self.config.audio_mode;
        let mut sources = Vec::new();
        for kind in mode.sources() {
            match self.backend.open_audio_source(kind, self.control.clone()) {
                Ok(source) => {
                    tracing::info!(source = %kind, device = source.name(), "Audio source opened");
                    sources.push(source);
                }
                Err(e) => {
                    tracing::warn!(source = %kind, error = %e, "Audio source omitted");
                }
            }
        }
        if !mode.is_mute() && sources.is_empty() {
            tracing::warn!(%mode, "No audio source could be opened; recording silence");
            faults.push(SessionFault::new(
                ErrorKind::DeviceOpenFailure,
                format!("no audio source could be opened for mode {mode}"),
            ));
        }
        sources
    }

    fn noise_reducer(&self) -> Option<NoiseReducer> {
        if !self.config.noise_reduction || self.config.audio_mode.is_mute() {
            return None;
        }
        match NoiseReducer::new(self.config.noise_strength, SAMPLE_RATE) {
            Ok(reducer) => Some(reducer),
            Err(e) => {
                tracing::warn!(error = %e, "Noise reduction unavailable; writing raw audio");
                None
            }
        }
    }

    fn volume(&self, kind: AudioSourceKind) -> u8 {
        match kind {
            AudioSourceKind::System => self.config.system_volume,
            AudioSourceKind::Microphone => self.config.mic_volume,
        }
    }

    /// Read `frames` from every source, mix, and denoise.
    ///
    /// A failed read contributes silence for this cycle. A source whose
    /// failure is fatal is dropped for the rest of the session.
    fn mix_cycle(&self, cycle: &mut Cycle, frames: usize) -> AudioChunk {
        let timeout = frames_to_duration(frames as u64 * 2);
        let mut inputs = Vec::with_capacity(cycle.sources.len());
        let mut broken = Vec::new();
        for (index, source) in cycle.sources.iter_mut().enumerate() {
            let chunk = match source.read(frames, timeout) {
                Ok(chunk) => Some(chunk),
                Err(e) if e.kind().policy() == FailurePolicy::Fatal => {
                    tracing::error!(
                        source = %source.kind(),
                        error = %e,
                        "Audio source failed; dropping it"
                    );
                    cycle.dropped.push(SessionFault::from_error(&e));
                    broken.push(index);
                    None
                }
                Err(e) => {
                    cycle.read_failures += 1;
                    if cycle.read_failures == 1 || cycle.read_failures % 50 == 0 {
                        tracing::warn!(
                            source = %source.kind(),
                            failures = cycle.read_failures,
                            error = %e,
                            "Audio read failed; using silence for this cycle"
                        );
                    }
                    None
                }
            };
            inputs.push((chunk, self.volume(source.kind())));
        }
        for index in broken.into_iter().rev() {
            cycle.sources.remove(index);
        }

        let mixed = AudioMixer::new(frames, CHANNELS)
            .mix(inputs.iter().map(|(chunk, volume)| (chunk.as_ref(), *volume)));

        match &cycle.reducer {
            Some(reducer) => match reducer.reduce(mixed) {
                Reduced::PassedThrough(raw) => {
                    StatsCounters::bump(&self.stats.dsp_passthroughs);
                    raw
                }
                other => other.into_chunk(),
            },
            None => mixed,
        }
    }
}

/// Stereo frames produced by `elapsed` of recording.
fn frames_due(elapsed: Duration) -> u64 {
    (elapsed.as_nanos() * SAMPLE_RATE as u128 / 1_000_000_000) as u64
}

fn frames_to_duration(frames: u64) -> Duration {
    Duration::from_nanos(frames * 1_000_000_000 / SAMPLE_RATE as u64)
}
