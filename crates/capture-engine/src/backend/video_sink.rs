//! Intermediate video encoding through a GStreamer `appsrc` pipeline.
//!
//! Frames are pushed as raw BGR buffers stamped with the session's active
//! clock, so paused time never reaches the encoder. `videorate` turns the
//! best-effort capture cadence into a constant frame rate before
//! Motion-JPEG encoding into AVI.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use recast_common::error::{RecastError, RecastResult};
use recast_render_engine::Frame;
use recast_session_model::FrameSize;

use super::VideoSink;

/// Elements the intermediate video pipeline needs.
pub const REQUIRED_ELEMENTS: [&str; 6] = [
    "appsrc",
    "videoconvert",
    "videorate",
    "jpegenc",
    "avimux",
    "filesink",
];

const SOURCE_NAME: &str = "frames";
const EOS_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GstVideoSink {
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    frame_duration: gst::ClockTime,
    last_pts: Option<u64>,
    frames: u64,
    path: PathBuf,
}

impl GstVideoSink {
    /// Build and start the pipeline writing `path`.
    pub fn open(path: &Path, size: FrameSize, fps: u32) -> RecastResult<Self> {
        init_gstreamer()?;
        if !size.is_valid() || fps == 0 {
            return Err(RecastError::encode(format!(
                "Cannot encode {size} at {fps} fps"
            )));
        }

        let launch = pipeline_description(path, fps);
        let pipeline = gst::parse::launch(&launch)
            .map_err(|e| RecastError::encode(format!("Failed to build video pipeline: {e}")))?
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| RecastError::encode("Launch string did not produce a pipeline"))?;

        let appsrc = pipeline
            .by_name(SOURCE_NAME)
            .and_downcast::<gst_app::AppSrc>()
            .ok_or_else(|| RecastError::encode("Video pipeline has no frame source"))?;
        let caps = gst::Caps::builder("video/x-raw")
            .field("format", "BGR")
            .field("width", size.width as i32)
            .field("height", size.height as i32)
            .field("framerate", gst::Fraction::new(fps as i32, 1))
            .build();
        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gst::Format::Time);

        pipeline.set_state(gst::State::Playing).map_err(|e| {
            RecastError::encode(format!("Failed to start video pipeline: {e:?}"))
        })?;

        tracing::info!(
            path = %path.display(),
            width = size.width,
            height = size.height,
            fps,
            "Video sink started"
        );
        Ok(Self {
            pipeline,
            appsrc,
            frame_duration: gst::ClockTime::from_nseconds(1_000_000_000 / fps as u64),
            last_pts: None,
            frames: 0,
            path: path.to_path_buf(),
        })
    }

    /// Surface an asynchronous pipeline error, if one was posted.
    fn check_bus(&self) -> RecastResult<()> {
        let Some(bus) = self.pipeline.bus() else {
            return Ok(());
        };
        if let Some(msg) = bus.pop_filtered(&[gst::MessageType::Error]) {
            if let gst::MessageView::Error(e) = msg.view() {
                return Err(RecastError::encode(format!(
                    "Video pipeline error: {} ({:?})",
                    e.error(),
                    e.debug()
                )));
            }
        }
        Ok(())
    }

    /// Wait for EOS to reach the sink so the AVI index is written.
    fn drain(&self) {
        let Some(bus) = self.pipeline.bus() else {
            return;
        };
        let start = Instant::now();
        loop {
            let elapsed = start.elapsed();
            if elapsed >= EOS_TIMEOUT {
                tracing::warn!(path = %self.path.display(), "EOS drain timed out");
                break;
            }
            let remaining = gst::ClockTime::from_nseconds((EOS_TIMEOUT - elapsed).as_nanos() as u64);
            match bus.timed_pop(remaining) {
                Some(msg) => match msg.view() {
                    gst::MessageView::Eos(_) => {
                        tracing::debug!(path = %self.path.display(), "EOS received; video drained");
                        break;
                    }
                    gst::MessageView::Error(e) => {
                        tracing::warn!(error = %e.error(), "Video pipeline error during EOS drain");
                        break;
                    }
                    _ => {}
                },
                None => {
                    tracing::warn!(path = %self.path.display(), "EOS drain timed out");
                    break;
                }
            }
        }
    }
}

impl VideoSink for GstVideoSink {
    fn write(&mut self, frame: &Frame) -> RecastResult<()> {
        self.check_bus()?;

        let mut pts = frame.timestamp.as_nanos() as u64;
        if let Some(last) = self.last_pts {
            pts = pts.max(last + 1);
        }
        let mut buffer = gst::Buffer::from_mut_slice(frame.as_bytes().to_vec());
        if let Some(buf) = buffer.get_mut() {
            buf.set_pts(gst::ClockTime::from_nseconds(pts));
            buf.set_duration(self.frame_duration);
        }
        self.appsrc
            .push_buffer(buffer)
            .map_err(|e| RecastError::encode(format!("Video pipeline rejected frame: {e:?}")))?;
        self.last_pts = Some(pts);
        self.frames += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> RecastResult<()> {
        match self.appsrc.end_of_stream() {
            Ok(_) => self.drain(),
            Err(e) => tracing::warn!(error = ?e, "Failed to send EOS; video may be truncated"),
        }
        self.pipeline.set_state(gst::State::Null).map_err(|e| {
            RecastError::encode(format!("Failed to stop video pipeline: {e:?}"))
        })?;
        tracing::info!(path = %self.path.display(), frames = self.frames, "Video sink finished");
        Ok(())
    }
}

fn pipeline_description(path: &Path, fps: u32) -> String {
    let path = escape_path(path);
    // The queue decouples the capture loop from encoder stalls.
    format!(
        "appsrc name={SOURCE_NAME} ! queue max-size-buffers=8 ! videoconvert ! videorate ! video/x-raw,framerate={fps}/1 ! jpegenc quality=90 ! avimux ! filesink location=\"{path}\""
    )
}

/// Names of required GStreamer elements that are not installed.
pub fn missing_elements() -> RecastResult<Vec<&'static str>> {
    init_gstreamer()?;
    Ok(REQUIRED_ELEMENTS
        .iter()
        .copied()
        .filter(|name| gst::ElementFactory::find(name).is_none())
        .collect())
}

fn init_gstreamer() -> RecastResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(RecastError::encode(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_targets_mjpeg_avi_at_session_rate() {
        let launch = pipeline_description(Path::new("/tmp/recast-x/video.avi"), 60);
        assert!(launch.starts_with("appsrc name=frames"));
        assert!(launch.contains("video/x-raw,framerate=60/1"));
        assert!(launch.contains("jpegenc"));
        assert!(launch.contains("avimux ! filesink location=\"/tmp/recast-x/video.avi\""));
    }

    #[test]
    fn quotes_in_paths_are_escaped() {
        assert_eq!(escape_path(Path::new("/tmp/a\"b.avi")), "/tmp/a\\\"b.avi");
    }
}
