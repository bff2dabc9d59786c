//! Final container muxing through the `ffmpeg` CLI.

use std::ffi::OsString;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use recast_common::error::{RecastError, RecastResult};

use super::Muxer;

/// Muxes with an external `ffmpeg` binary: H.264 (ultrafast, CRF 23,
/// yuv420p) plus AAC.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    binary: PathBuf,
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegMuxer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Whether the configured binary can be found.
    pub fn is_available(&self) -> bool {
        if self.binary.components().count() > 1 {
            return self.binary.is_file();
        }
        command_exists(&self.binary.to_string_lossy())
    }

    fn run(&self, args: Vec<OsString>) -> RecastResult<()> {
        tracing::debug!(binary = %self.binary.display(), ?args, "Running ffmpeg");
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RecastError::mux(format!("Failed to start ffmpeg: {e}")))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RecastError::mux("Failed to capture ffmpeg stderr"))?;
        // Drain stderr concurrently to avoid ffmpeg blocking on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let status = child
            .wait()
            .map_err(|e| RecastError::mux(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(RecastError::mux(format!(
                "ffmpeg failed (status {status}): {}",
                tail(&stderr_output, 20)
            )));
        }
        Ok(())
    }
}

impl Muxer for FfmpegMuxer {
    fn combine(&self, video: &Path, audio: &Path, fps: u32, output: &Path) -> RecastResult<()> {
        self.run(combine_args(video, audio, fps, output))
    }

    fn video_only(&self, video: &Path, fps: u32, output: &Path) -> RecastResult<()> {
        self.run(video_only_args(video, fps, output))
    }
}

fn combine_args(video: &Path, audio: &Path, fps: u32, output: &Path) -> Vec<OsString> {
    let rate = fps.to_string();
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), video.into(), "-i".into(), audio.into()];
    args.extend(
        [
            "-map", "0:v:0", "-map", "1:a:0", "-r", rate.as_str(), "-c:v", "libx264",
            "-preset", "ultrafast", "-crf", "23", "-pix_fmt", "yuv420p", "-c:a", "aac",
        ]
        .map(OsString::from),
    );
    args.push(output.into());
    args
}

fn video_only_args(video: &Path, fps: u32, output: &Path) -> Vec<OsString> {
    let rate = fps.to_string();
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), video.into()];
    args.extend(
        [
            "-r", rate.as_str(), "-c:v", "libx264", "-preset", "ultrafast", "-crf", "23",
            "-pix_fmt", "yuv420p", "-an",
        ]
        .map(OsString::from),
    );
    args.push(output.into());
    args
}

/// Last `lines` lines of `text`.
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim().lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn combine_encodes_h264_and_aac() {
        let args = strings(combine_args(
            Path::new("v.avi"),
            Path::new("a.wav"),
            30,
            Path::new("out.mp4"),
        ));
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -i v.avi -i a.wav"));
        assert!(joined.contains("-r 30 -c:v libx264 -preset ultrafast -crf 23 -pix_fmt yuv420p"));
        assert!(joined.contains("-c:a aac"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn fallback_drops_audio() {
        let args = strings(video_only_args(Path::new("v.avi"), 60, Path::new("out.mp4")));
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.iter().any(|a| a.ends_with(".wav") || a == "aac"));
        assert!(args.join(" ").contains("-r 60"));
    }

    #[test]
    fn missing_binary_is_a_mux_failure() {
        let muxer = FfmpegMuxer::new("/nonexistent/ffmpeg-for-tests");
        assert!(!muxer.is_available());
        let err = muxer
            .video_only(Path::new("v.avi"), 30, Path::new("out.mp4"))
            .unwrap_err();
        assert_eq!(err.kind(), recast_common::error::ErrorKind::MuxFailure);
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail("only", 5), "only");
    }
}
