//! Capture backends.
//!
//! A [`CaptureBackend`] is a factory for everything a session touches
//! outside the process: the display, the intermediate encoders, the audio
//! devices, the pointer, and the final muxer. Sessions only ever talk to
//! these traits, so tests can swap the whole system for in-memory fakes.
//!
//! Sources and sinks are opened on the capture thread that uses them and
//! are not required to be `Send` (audio streams and some display handles
//! are tied to their opening thread).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use recast_audio_dsp::AudioChunk;
use recast_common::error::RecastResult;
use recast_input_tracker::PointerBackend;
use recast_render_engine::{ClickFeedback, Frame};
use recast_session_model::{AudioSourceKind, CaptureRect, FrameSize};

use crate::control::SessionControl;

pub mod audio_sink;
pub mod audio_source;
pub mod click_sound;
pub mod frame_source;
pub mod mux;
pub mod video_sink;

pub use audio_sink::WavSink;
pub use audio_source::CpalSource;
pub use click_sound::ClickSound;
pub use frame_source::ScreenSource;
pub use mux::FfmpegMuxer;
pub use video_sink::GstVideoSink;

/// Grabs raw screen pixels.
pub trait FrameSource {
    /// The captured rectangle in virtual-desktop pixels.
    fn region(&self) -> CaptureRect;

    /// Grab the region once.
    fn capture(&mut self) -> RecastResult<RgbaImage>;
}

/// Encodes composited frames into the intermediate video stream.
pub trait VideoSink {
    /// Append one frame. Frames arrive in timestamp order.
    fn write(&mut self, frame: &Frame) -> RecastResult<()>;

    /// Flush and close the stream.
    fn finish(self: Box<Self>) -> RecastResult<()>;
}

/// One open audio input.
pub trait AudioSource {
    fn kind(&self) -> AudioSourceKind;

    /// Device name for logging.
    fn name(&self) -> &str;

    /// Read exactly `frames` stereo frames, waiting at most `timeout`.
    fn read(&mut self, frames: usize, timeout: Duration) -> RecastResult<AudioChunk>;
}

/// Writes mixed chunks into the intermediate audio stream.
pub trait AudioSink {
    fn write(&mut self, chunk: &AudioChunk) -> RecastResult<()>;

    fn finish(self: Box<Self>) -> RecastResult<()>;
}

/// Joins the intermediate streams into the final container.
pub trait Muxer: Send + Sync {
    /// Combine video and audio into `output`.
    fn combine(&self, video: &Path, audio: &Path, fps: u32, output: &Path) -> RecastResult<()>;

    /// Transcode the video alone into `output`.
    fn video_only(&self, video: &Path, fps: u32, output: &Path) -> RecastResult<()>;
}

/// Abstract interface for the platform services a session needs.
pub trait CaptureBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Open the display for `rect`, or the primary display when `None`.
    fn open_frame_source(&self, rect: Option<CaptureRect>) -> RecastResult<Box<dyn FrameSource>>;

    /// Open the intermediate video encoder writing to `path`.
    fn open_video_sink(
        &self,
        path: &Path,
        size: FrameSize,
        fps: u32,
    ) -> RecastResult<Box<dyn VideoSink>>;

    /// Open one logical audio input. Data delivered while `control` is
    /// not recording is dropped.
    fn open_audio_source(
        &self,
        kind: AudioSourceKind,
        control: Arc<SessionControl>,
    ) -> RecastResult<Box<dyn AudioSource>>;

    /// Open the intermediate audio writer at `path`.
    fn open_audio_sink(&self, path: &Path) -> RecastResult<Box<dyn AudioSink>>;

    /// Pointer sampling for mouse effects.
    fn pointer_backend(&self) -> Box<dyn PointerBackend>;

    /// Audible click feedback, if the backend has an output device.
    fn click_feedback(&self) -> Option<Box<dyn ClickFeedback>> {
        None
    }

    fn muxer(&self) -> &dyn Muxer;
}

/// The real thing: xcap, GStreamer, cpal, hound, and ffmpeg.
#[derive(Debug, Default)]
pub struct SystemBackend {
    muxer: FfmpegMuxer,
}

impl SystemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific ffmpeg binary for the final mux.
    pub fn with_muxer(muxer: FfmpegMuxer) -> Self {
        Self { muxer }
    }
}

impl CaptureBackend for SystemBackend {
    fn name(&self) -> &str {
        "system"
    }

    fn open_frame_source(&self, rect: Option<CaptureRect>) -> RecastResult<Box<dyn FrameSource>> {
        Ok(Box::new(ScreenSource::open(rect)?))
    }

    fn open_video_sink(
        &self,
        path: &Path,
        size: FrameSize,
        fps: u32,
    ) -> RecastResult<Box<dyn VideoSink>> {
        Ok(Box::new(GstVideoSink::open(path, size, fps)?))
    }

    fn open_audio_source(
        &self,
        kind: AudioSourceKind,
        control: Arc<SessionControl>,
    ) -> RecastResult<Box<dyn AudioSource>> {
        Ok(Box::new(CpalSource::open(kind, control)?))
    }

    fn open_audio_sink(&self, path: &Path) -> RecastResult<Box<dyn AudioSink>> {
        Ok(Box::new(WavSink::create(path)?))
    }

    fn pointer_backend(&self) -> Box<dyn PointerBackend> {
        recast_input_tracker::detect_best_backend()
    }

    fn click_feedback(&self) -> Option<Box<dyn ClickFeedback>> {
        ClickSound::start().map(|sound| Box::new(sound) as Box<dyn ClickFeedback>)
    }

    fn muxer(&self) -> &dyn Muxer {
        &self.muxer
    }
}
