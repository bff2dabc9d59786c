//! The video path: grab, composite, encode, once per frame interval.

use std::sync::Arc;

use crossbeam_channel::Sender;
use recast_common::clock::FramePacer;
use recast_common::error::{FailurePolicy, RecastError, RecastResult};
use recast_input_tracker::PointerTracker;
use recast_render_engine::{Frame, OverlayCompositor};

use crate::backend::{CaptureBackend, FrameSource, VideoSink};
use crate::control::{SessionControl, SessionState};
use crate::session::{wait_for_start, CapturePath, IntermediatePaths, SessionConfig, SessionFault};
use crate::stats::StatsCounters;

/// Everything the video thread needs, moved onto it at start.
pub(crate) struct VideoPath {
    pub config: Arc<SessionConfig>,
    pub backend: Arc<dyn CaptureBackend>,
    pub control: Arc<SessionControl>,
    pub stats: Arc<StatsCounters>,
    pub paths: IntermediatePaths,
}

struct Opened {
    source: Box<dyn FrameSource>,
    sink: Box<dyn VideoSink>,
}

impl VideoPath {
    /// Thread body. Reports readiness on `ready`, then captures until the
    /// session stops. Returns faults that must be surfaced.
    pub fn run(self, ready: Sender<(CapturePath, RecastResult<()>)>) -> Vec<SessionFault> {
        let opened = match self.open() {
            Ok(opened) => {
                let _ = ready.send((CapturePath::Video, Ok(())));
                opened
            }
            Err(e) => {
                let _ = ready.send((CapturePath::Video, Err(e)));
                return Vec::new();
            }
        };
        if !wait_for_start(&self.control) {
            let _ = opened.sink.finish();
            return Vec::new();
        }
        self.capture_loop(opened)
    }

    fn open(&self) -> RecastResult<Opened> {
        let source = self.backend.open_frame_source(self.config.capture_rect)?;
        let sink = self.backend.open_video_sink(
            &self.paths.video,
            self.config.frame_size,
            self.config.fps,
        )?;
        Ok(Opened { source, sink })
    }

    fn capture_loop(&self, opened: Opened) -> Vec<SessionFault> {
        let Opened { mut source, mut sink } = opened;
        let config = &self.config;
        let mut faults = Vec::new();

        let mut compositor = OverlayCompositor::new(
            config.frame_size,
            source.region(),
            config.mouse,
            &config.watermark,
        );
        if config.mouse.click.enabled && config.mouse.click.sound {
            if let Some(feedback) = self.backend.click_feedback() {
                compositor = compositor.with_click_feedback(feedback);
            }
        }
        let mut tracker = compositor
            .wants_pointer()
            .then(|| PointerTracker::new(self.backend.pointer_backend()));

        let tolerance = config.capture_miss_tolerance.max(1);
        let mut misses: u32 = 0;
        let mut last: Option<Frame> = None;
        let mut pacer = FramePacer::new(config.fps);

        tracing::info!(
            fps = config.fps,
            width = config.frame_size.width,
            height = config.frame_size.height,
            pointer = tracker.as_ref().map(|t| t.backend_name()).unwrap_or("none"),
            "Video path started"
        );

        loop {
            pacer.begin_tick();
            match self.control.state() {
                SessionState::Recording => {}
                SessionState::Paused | SessionState::Idle => {
                    pacer.wait();
                    continue;
                }
                SessionState::Stopping | SessionState::Stopped => break,
            }

            let timestamp = self.control.active_elapsed();
            let pointer = tracker.as_mut().map(|t| t.poll());

            let frame = match source.capture() {
                Ok(raw) => {
                    misses = 0;
                    StatsCounters::bump(&self.stats.frames_captured);
                    compositor.compose(&raw, timestamp, pointer)
                }
                Err(e) if e.kind().policy() != FailurePolicy::Skip => {
                    tracing::error!(error = %e, "Screen grab failed; stopping video path");
                    faults.push(SessionFault::from_error(&e));
                    break;
                }
                Err(e) => {
                    misses = misses.saturating_add(1);
                    StatsCounters::bump(&self.stats.capture_misses);
                    if misses == 1 {
                        tracing::debug!(error = %e, "Screen grab failed; repeating last frame");
                    }
                    if misses == tolerance {
                        tracing::warn!(misses, error = %e, "Display unavailable");
                        faults.push(SessionFault::from_error(&RecastError::capture(format!(
                            "{misses} consecutive screen grabs failed: {e}"
                        ))));
                    }
                    StatsCounters::bump(&self.stats.frames_reemitted);
                    match last.take() {
                        Some(mut previous) => {
                            previous.timestamp = timestamp;
                            previous
                        }
                        None => {
                            let mut black = Frame::black(config.frame_size, timestamp);
                            compositor.decorate(&mut black, pointer);
                            black
                        }
                    }
                }
            };

            if let Err(e) = sink.write(&frame) {
                tracing::error!(error = %e, "Video sink failed; stopping video path");
                faults.push(SessionFault::from_error(&e));
                break;
            }
            last = Some(frame);
            pacer.wait();
        }

        if compositor.skipped_steps() > 0 {
            tracing::info!(skipped = compositor.skipped_steps(), "Overlay steps were skipped");
        }
        if let Err(e) = sink.finish() {
            tracing::error!(error = %e, "Failed to finalize intermediate video");
            faults.push(SessionFault::from_error(&e));
        }
        faults
    }
}
