//! Recording session management.
//!
//! A [`RecordingSession`] owns two OS threads while recording: the video
//! path (grab, composite, encode) and the audio path (read, mix, denoise,
//! write). They share only the [`SessionControl`] and an immutable
//! [`SessionConfig`] snapshot. `stop` joins both threads, then muxes the
//! intermediate files into the final container.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use recast_common::config::{RecordingSettings, SUPPORTED_FPS};
use recast_common::error::{ErrorKind, FailurePolicy, RecastError, RecastResult};
use recast_session_model::{AudioMode, CaptureRect, FrameSize, MouseEffectSpec, WatermarkSettings};
use tempfile::TempDir;

use crate::audio_path::AudioPath;
use crate::backend::CaptureBackend;
use crate::control::{SessionControl, SessionState};
use crate::stats::{PipelineStats, StatsCounters};
use crate::video_path::VideoPath;

/// How long `start` waits for both paths to open their devices.
const READY_TIMEOUT: Duration = Duration::from_secs(15);

/// Everything a session needs, captured once at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Screen rectangle, or `None` for the primary display.
    pub capture_rect: Option<CaptureRect>,

    /// Size every frame is scaled to.
    pub frame_size: FrameSize,

    /// Target frame rate, 30 or 60.
    pub fps: u32,

    pub audio_mode: AudioMode,

    /// System loopback gain in percent.
    pub system_volume: u8,

    /// Microphone gain in percent.
    pub mic_volume: u8,

    pub noise_reduction: bool,

    /// Noise-reduction strength in `[0, 1]`.
    pub noise_strength: f32,

    /// Consecutive failed grabs before the display is reported unavailable.
    pub capture_miss_tolerance: u32,

    pub watermark: WatermarkSettings,

    pub mouse: MouseEffectSpec,

    /// Final container path.
    pub output_path: PathBuf,
}

impl SessionConfig {
    /// Snapshot the configured providers for one recording.
    pub fn from_settings(
        recording: &RecordingSettings,
        watermark: &WatermarkSettings,
        mouse: &MouseEffectSpec,
        capture_rect: Option<CaptureRect>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            capture_rect,
            frame_size: recording.frame_size,
            fps: recording.fps,
            audio_mode: recording.audio_mode,
            system_volume: recording.system_volume,
            mic_volume: recording.mic_volume,
            noise_reduction: recording.noise_reduction,
            noise_strength: recording.noise_strength,
            capture_miss_tolerance: recording.capture_miss_tolerance,
            watermark: watermark.clone(),
            mouse: *mouse,
            output_path: output_path.into(),
        }
    }

    /// Reject snapshots the pipeline cannot honour.
    pub fn validate(&self) -> RecastResult<()> {
        if !SUPPORTED_FPS.contains(&self.fps) {
            return Err(RecastError::config(format!(
                "fps must be one of {SUPPORTED_FPS:?}, got {}",
                self.fps
            )));
        }
        if !self.frame_size.is_valid() {
            return Err(RecastError::config(format!(
                "frame size must be positive, got {}",
                self.frame_size
            )));
        }
        if let Some(rect) = self.capture_rect {
            if !rect.is_valid() {
                return Err(RecastError::config(format!(
                    "capture rectangle {}x{} has no area",
                    rect.width, rect.height
                )));
            }
        }
        if self.system_volume > 100 || self.mic_volume > 100 {
            return Err(RecastError::config("volumes must be within [0, 100]"));
        }
        if !(0.0..=1.0).contains(&self.noise_strength) {
            return Err(RecastError::config(format!(
                "noise strength must be within [0, 1], got {}",
                self.noise_strength
            )));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(RecastError::config("output path is empty"));
        }
        Ok(())
    }
}

/// A failure surfaced to the caller at the end of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFault {
    pub kind: ErrorKind,
    pub message: String,
}

impl SessionFault {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn from_error(error: &RecastError) -> Self {
        Self::new(error.kind(), error.to_string())
    }
}

impl fmt::Display for SessionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Which streams made it into the final file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxOutcome {
    /// Video and audio combined.
    Combined,
    /// The combine failed; the video was transcoded alone.
    VideoOnly,
    /// No output could be produced.
    Failed,
}

/// Result of a finished session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Final container, if one was written.
    pub output: Option<PathBuf>,
    pub mux: MuxOutcome,
    /// Recorded time, pauses excluded.
    pub duration: Duration,
    pub faults: Vec<SessionFault>,
    pub stats: PipelineStats,
}

impl SessionReport {
    pub fn has_fault(&self, kind: ErrorKind) -> bool {
        self.faults.iter().any(|f| f.kind == kind)
    }
}

/// Called once, after the final mux, with the session report.
pub type FinishedCallback = Box<dyn FnOnce(&SessionReport) + Send>;

/// Intermediate stream locations inside the session's private directory.
#[derive(Debug, Clone)]
pub(crate) struct IntermediatePaths {
    pub video: PathBuf,
    pub audio: PathBuf,
}

impl IntermediatePaths {
    fn in_dir(dir: &Path) -> Self {
        Self {
            video: dir.join("video.avi"),
            audio: dir.join("audio.wav"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CapturePath {
    Video,
    Audio,
}

impl fmt::Display for CapturePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapturePath::Video => f.write_str("video"),
            CapturePath::Audio => f.write_str("audio"),
        }
    }
}

/// Block a capture thread until the session leaves `Idle`. Returns `false`
/// if it was told to stop instead.
pub(crate) fn wait_for_start(control: &SessionControl) -> bool {
    loop {
        match control.state() {
            SessionState::Idle => std::thread::sleep(Duration::from_millis(1)),
            SessionState::Recording | SessionState::Paused => return true,
            SessionState::Stopping | SessionState::Stopped => return false,
        }
    }
}

struct Running {
    workdir: TempDir,
    paths: IntermediatePaths,
    video: JoinHandle<Vec<SessionFault>>,
    audio: JoinHandle<Vec<SessionFault>>,
}

/// One start-to-stop recording.
pub struct RecordingSession {
    config: Arc<SessionConfig>,
    backend: Arc<dyn CaptureBackend>,
    control: Arc<SessionControl>,
    stats: Arc<StatsCounters>,
    running: Option<Running>,
    on_finished: Option<FinishedCallback>,
    report: Option<SessionReport>,
    ready_timeout: Duration,
}

impl RecordingSession {
    /// Create an idle session recording with `backend`.
    pub fn new(config: SessionConfig, backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            control: Arc::new(SessionControl::new()),
            stats: Arc::new(StatsCounters::default()),
            running: None,
            on_finished: None,
            report: None,
            ready_timeout: READY_TIMEOUT,
        }
    }

    /// Override how long `start` waits for the capture paths to open.
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Register the session-finished notification.
    pub fn on_finished(&mut self, callback: impl FnOnce(&SessionReport) + Send + 'static) {
        self.on_finished = Some(Box::new(callback));
    }

    pub fn state(&self) -> SessionState {
        self.control.state()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Recorded time so far, pauses excluded.
    pub fn elapsed(&self) -> Duration {
        self.control.active_elapsed()
    }

    /// Statistics so far.
    pub fn stats(&self) -> PipelineStats {
        self.stats.snapshot()
    }

    /// `Idle -> Recording`. No-op in any other state.
    ///
    /// Both paths open their devices before this returns. If the display
    /// or either intermediate writer cannot be opened the session stays
    /// `Idle` and the error is returned. Audio inputs that fail to open are
    /// omitted instead.
    ///
    /// The wait is bounded by the ready timeout. A path still opening when
    /// it expires is detached; it exits on its own once its open returns.
    pub fn start(&mut self) -> RecastResult<()> {
        if self.state() != SessionState::Idle || self.running.is_some() {
            tracing::debug!(state = ?self.state(), "start ignored");
            return Ok(());
        }
        self.config.validate()?;

        let workdir = tempfile::Builder::new().prefix("recast-").tempdir()?;
        let paths = IntermediatePaths::in_dir(workdir.path());
        tracing::info!(
            output = %self.config.output_path.display(),
            workdir = %workdir.path().display(),
            backend = self.backend.name(),
            "Starting recording session"
        );

        let (ready_tx, ready_rx) = crossbeam_channel::bounded(2);
        let video = VideoPath {
            config: self.config.clone(),
            backend: self.backend.clone(),
            control: self.control.clone(),
            stats: self.stats.clone(),
            paths: paths.clone(),
        };
        let video_ready = ready_tx.clone();
        let video = std::thread::Builder::new()
            .name("recast-video".to_string())
            .spawn(move || video.run(video_ready))?;

        let audio = AudioPath {
            config: self.config.clone(),
            backend: self.backend.clone(),
            control: self.control.clone(),
            stats: self.stats.clone(),
            paths: paths.clone(),
        };
        let audio = match std::thread::Builder::new()
            .name("recast-audio".to_string())
            .spawn(move || audio.run(ready_tx))
        {
            Ok(handle) => handle,
            Err(e) => {
                self.abort_start([Some(video), None], true);
                return Err(e.into());
            }
        };

        let mut failure = None;
        let mut timed_out = false;
        for _ in 0..2 {
            match ready_rx.recv_timeout(self.ready_timeout) {
                Ok((_, Ok(()))) => {}
                Ok((path, Err(e))) => {
                    tracing::error!(%path, error = %e, "Capture path failed to open");
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
                Err(_) => {
                    timed_out = true;
                    if failure.is_none() {
                        failure = Some(RecastError::session(
                            "capture paths did not report readiness in time",
                        ));
                    }
                    break;
                }
            }
        }
        if let Some(e) = failure {
            self.abort_start([Some(video), Some(audio)], !timed_out);
            return Err(e);
        }

        self.control.start();
        self.running = Some(Running {
            workdir,
            paths,
            video,
            audio,
        });
        tracing::info!("Recording session started");
        Ok(())
    }

    /// Return to `Idle` after a failed start. With `join` false the
    /// threads are left running against the aborted control, and the
    /// session continues with a fresh one.
    fn abort_start(
        &mut self,
        handles: [Option<JoinHandle<Vec<SessionFault>>>; 2],
        join: bool,
    ) {
        self.control.abort();
        if join {
            for handle in handles.into_iter().flatten() {
                let _ = handle.join();
            }
            self.control.reset();
        } else {
            tracing::warn!(
                timeout_secs = self.ready_timeout.as_secs_f64(),
                "Capture paths still opening; detaching them"
            );
            drop(handles);
            self.control = Arc::new(SessionControl::new());
        }
    }

    /// `Recording -> Paused`. Returns whether the state changed.
    pub fn pause(&mut self) -> bool {
        let changed = self.control.pause();
        if changed {
            tracing::info!(elapsed_secs = self.elapsed().as_secs_f64(), "Recording paused");
        }
        changed
    }

    /// `Paused -> Recording`. Returns whether the state changed.
    pub fn resume(&mut self) -> bool {
        let changed = self.control.resume();
        if changed {
            tracing::info!("Recording resumed");
        }
        changed
    }

    /// `Recording | Paused -> Stopping -> Stopped`.
    ///
    /// Joins both paths, muxes, removes intermediates, and fires the
    /// finished notification. Returns `None` when the session was never
    /// started; a second call returns the same report without redoing
    /// any work.
    pub fn stop(&mut self) -> RecastResult<Option<SessionReport>> {
        if !self.control.stop() {
            tracing::debug!(state = ?self.state(), "stop ignored");
            return Ok(self.report.clone());
        }
        let Some(running) = self.running.take() else {
            return Err(RecastError::session("session has no running capture paths"));
        };
        tracing::info!(
            duration_secs = self.elapsed().as_secs_f64(),
            "Stopping recording session"
        );

        let mut faults = Vec::new();
        faults.extend(join_path(CapturePath::Video, running.video));
        faults.extend(join_path(CapturePath::Audio, running.audio));

        let (output, mux) = self.mux(&running.paths);
        if mux == MuxOutcome::Failed {
            faults.push(SessionFault::new(
                ErrorKind::MuxFailure,
                "no output file could be written",
            ));
        }
        cleanup(running.workdir, &running.paths);

        self.control.finish();
        let report = SessionReport {
            output,
            mux,
            duration: self.elapsed(),
            faults,
            stats: self.stats.snapshot(),
        };
        tracing::info!(
            output = ?report.output,
            mux = ?report.mux,
            duration_secs = report.duration.as_secs_f64(),
            faults = report.faults.len(),
            frames = report.stats.frames_written(),
            chunks = report.stats.chunks_written,
            "Recording session finished"
        );

        if let Some(callback) = self.on_finished.take() {
            callback(&report);
        }
        self.report = Some(report.clone());
        Ok(Some(report))
    }

    fn mux(&self, paths: &IntermediatePaths) -> (Option<PathBuf>, MuxOutcome) {
        let muxer = self.backend.muxer();
        let output = &self.config.output_path;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(dir = %parent.display(), error = %e, "Failed to create output directory");
            }
        }

        match muxer.combine(&paths.video, &paths.audio, self.config.fps, output) {
            Ok(()) => return (Some(output.clone()), MuxOutcome::Combined),
            Err(e) if e.kind().policy() == FailurePolicy::Fallback => {
                tracing::warn!(error = %e, "Combining audio and video failed; writing video only");
            }
            Err(e) => {
                tracing::error!(error = %e, "Combining audio and video failed");
                return (None, MuxOutcome::Failed);
            }
        }
        match muxer.video_only(&paths.video, self.config.fps, output) {
            Ok(()) => (Some(output.clone()), MuxOutcome::VideoOnly),
            Err(e) => {
                tracing::error!(error = %e, "Video-only fallback failed");
                (None, MuxOutcome::Failed)
            }
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        // Dropped while recording: stop the threads, skip muxing. The
        // private directory goes with the TempDir.
        if let Some(running) = self.running.take() {
            self.control.stop();
            let _ = running.video.join();
            let _ = running.audio.join();
            tracing::warn!("Recording session dropped without stop; output discarded");
        }
    }
}

fn join_path(path: CapturePath, handle: JoinHandle<Vec<SessionFault>>) -> Vec<SessionFault> {
    match handle.join() {
        Ok(faults) => faults,
        Err(_) => {
            tracing::error!(%path, "Capture path panicked");
            vec![SessionFault::new(
                ErrorKind::Session,
                format!("{path} path panicked"),
            )]
        }
    }
}

/// Remove intermediates and the private directory, best effort.
fn cleanup(workdir: TempDir, paths: &IntermediatePaths) {
    for file in [&paths.video, &paths.audio] {
        if file.exists() {
            if let Err(e) = std::fs::remove_file(file) {
                let err = RecastError::cleanup(format!("{}: {e}", file.display()));
                tracing::debug!(error = %err, "Ignoring cleanup failure");
            }
        }
    }
    let dir = workdir.path().to_path_buf();
    if let Err(e) = workdir.close() {
        let err = RecastError::cleanup(format!("{}: {e}", dir.display()));
        tracing::debug!(error = %err, "Ignoring cleanup failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig::from_settings(
            &RecordingSettings::default(),
            &WatermarkSettings::default(),
            &MouseEffectSpec::default(),
            None,
            "/tmp/out.mp4",
        )
    }

    #[test]
    fn snapshot_copies_recording_settings() {
        let settings = RecordingSettings {
            fps: 60,
            mic_volume: 40,
            audio_mode: AudioMode::MicOnly,
            ..Default::default()
        };
        let snapshot = SessionConfig::from_settings(
            &settings,
            &WatermarkSettings::default(),
            &MouseEffectSpec::disabled(),
            Some(CaptureRect::new(0, 0, 800, 600)),
            "out.mp4",
        );
        assert_eq!(snapshot.fps, 60);
        assert_eq!(snapshot.mic_volume, 40);
        assert_eq!(snapshot.audio_mode, AudioMode::MicOnly);
        assert_eq!(snapshot.output_path, PathBuf::from("out.mp4"));
        snapshot.validate().unwrap();
    }

    #[test]
    fn validation_rejects_bad_snapshots() {
        let mut bad = config();
        bad.fps = 25;
        assert_eq!(bad.validate().unwrap_err().kind(), ErrorKind::Config);

        let mut bad = config();
        bad.capture_rect = Some(CaptureRect::new(0, 0, 0, 600));
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.output_path = PathBuf::new();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn intermediates_live_in_the_private_directory() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IntermediatePaths::in_dir(dir.path());
        assert_eq!(paths.video, dir.path().join("video.avi"));
        assert_eq!(paths.audio, dir.path().join("audio.wav"));
    }

    #[test]
    fn cleanup_removes_files_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let paths = IntermediatePaths::in_dir(&root);
        std::fs::write(&paths.video, b"v").unwrap();
        cleanup(dir, &paths);
        assert!(!root.exists());
    }
}
