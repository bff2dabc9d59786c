//! Recast Capture Engine
//!
//! Runs recording sessions: a video path and an audio path on their own
//! threads, both timed by one pause-aware clock, each writing an
//! intermediate stream into a private temp directory. Stopping joins the
//! paths and muxes the intermediates into the final container.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    RecordingSession                      │
//! │                 (SessionControl, clock)                  │
//! │  ┌────────────────────────┐  ┌─────────────────────────┐ │
//! │  │ video path             │  │ audio path              │ │
//! │  │ FrameSource ─► Overlay │  │ AudioSource(s) ─► Mixer │ │
//! │  │ Compositor ─► VideoSink│  │ ─► NoiseReducer ─► Sink │ │
//! │  └───────────┬────────────┘  └────────────┬────────────┘ │
//! │              ▼                            ▼              │
//! │          video.avi                    audio.wav          │
//! │              └──────────► Muxer ◄─────────┘              │
//! │                             │                            │
//! │                             ▼                            │
//! │                        output.mp4                        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! All platform access goes through [`backend::CaptureBackend`];
//! [`backend::SystemBackend`] is the real implementation.

mod audio_path;
pub mod backend;
pub mod control;
pub mod session;
pub mod stats;
mod video_path;

pub use backend::{CaptureBackend, SystemBackend};
pub use control::{SessionControl, SessionState};
pub use session::{
    FinishedCallback, MuxOutcome, RecordingSession, SessionConfig, SessionFault, SessionReport,
};
pub use stats::PipelineStats;
