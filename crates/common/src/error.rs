//! Error types shared across Recast crates.
//!
//! The variants follow the recorder's failure taxonomy. Each kind carries its
//! own degradation policy (see [`ErrorKind::policy`]). The capture session
//! branches on it where a stage can fail mid-recording:
//!
//! - screen grabs: `Skip` repeats the last frame, anything else ends the video path
//! - audio reads: `Fatal` drops the source, anything else is one cycle of silence
//! - the final combine: `Fallback` transcodes the video alone

use std::path::PathBuf;

/// Top-level error type for Recast operations.
#[derive(Debug, thiserror::Error)]
pub enum RecastError {
    /// Display or capture rectangle could not be read.
    #[error("Capture unavailable: {message}")]
    CaptureUnavailable { message: String },

    /// An audio input device could not be opened or read.
    #[error("Audio device failure: {message}")]
    DeviceOpen { message: String },

    /// A noise-reduction stage failed for the current chunk.
    #[error("DSP failure: {message}")]
    Dsp { message: String },

    /// The final audio/video combine step failed.
    #[error("Mux failure: {message}")]
    Mux { message: String },

    /// Removing an intermediate file failed.
    #[error("Cleanup failure: {message}")]
    Cleanup { message: String },

    /// Encoding a frame or chunk into an intermediate stream failed.
    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using RecastError.
pub type RecastResult<T> = Result<T, RecastError>;

/// Failure taxonomy used by the session's degradation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CaptureUnavailable,
    DeviceOpenFailure,
    DspFailure,
    MuxFailure,
    CleanupFailure,
    Encode,
    Config,
    Session,
    Io,
    Other,
}

/// What the pipeline does when a stage fails with a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Skip this cycle's work and carry on.
    Skip,
    /// Substitute a neutral value (silence, raw chunk) and carry on.
    PassThrough,
    /// Switch to the documented fallback path.
    Fallback,
    /// Log and ignore.
    Ignore,
    /// Abort the current operation and return the error.
    Fatal,
}

impl ErrorKind {
    /// Degradation policy for this kind of failure.
    pub fn policy(self) -> FailurePolicy {
        match self {
            ErrorKind::CaptureUnavailable => FailurePolicy::Skip,
            ErrorKind::DeviceOpenFailure => FailurePolicy::Skip,
            ErrorKind::DspFailure => FailurePolicy::PassThrough,
            ErrorKind::MuxFailure => FailurePolicy::Fallback,
            ErrorKind::CleanupFailure => FailurePolicy::Ignore,
            ErrorKind::Encode
            | ErrorKind::Config
            | ErrorKind::Session
            | ErrorKind::Io
            | ErrorKind::Other => FailurePolicy::Fatal,
        }
    }
}

impl RecastError {
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::CaptureUnavailable {
            message: msg.into(),
        }
    }

    pub fn device(msg: impl Into<String>) -> Self {
        Self::DeviceOpen {
            message: msg.into(),
        }
    }

    pub fn dsp(msg: impl Into<String>) -> Self {
        Self::Dsp {
            message: msg.into(),
        }
    }

    pub fn mux(msg: impl Into<String>) -> Self {
        Self::Mux {
            message: msg.into(),
        }
    }

    pub fn cleanup(msg: impl Into<String>) -> Self {
        Self::Cleanup {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Map this error onto the failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecastError::CaptureUnavailable { .. } => ErrorKind::CaptureUnavailable,
            RecastError::DeviceOpen { .. } => ErrorKind::DeviceOpenFailure,
            RecastError::Dsp { .. } => ErrorKind::DspFailure,
            RecastError::Mux { .. } => ErrorKind::MuxFailure,
            RecastError::Cleanup { .. } => ErrorKind::CleanupFailure,
            RecastError::Encode { .. } => ErrorKind::Encode,
            RecastError::Config { .. } => ErrorKind::Config,
            RecastError::Session { .. } => ErrorKind::Session,
            RecastError::FileNotFound { .. } | RecastError::Io(_) => ErrorKind::Io,
            RecastError::Unsupported { .. } | RecastError::Json(_) | RecastError::Other(_) => {
                ErrorKind::Other
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_degradation_table() {
        assert_eq!(
            RecastError::capture("no display").kind().policy(),
            FailurePolicy::Skip
        );
        assert_eq!(
            RecastError::dsp("nan").kind().policy(),
            FailurePolicy::PassThrough
        );
        assert_eq!(
            RecastError::mux("ffmpeg exited 1").kind().policy(),
            FailurePolicy::Fallback
        );
        assert_eq!(
            RecastError::cleanup("busy").kind().policy(),
            FailurePolicy::Ignore
        );
        assert_eq!(
            RecastError::encode("appsrc").kind().policy(),
            FailurePolicy::Fatal
        );
    }

    #[test]
    fn io_errors_convert_transparently() {
        let err: RecastError = std::io::Error::other("disk full").into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.to_string(), "disk full");
    }
}
