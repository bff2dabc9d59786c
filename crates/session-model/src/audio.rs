//! Audio source modes and stream constants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Sample rate of every intermediate audio stream.
pub const SAMPLE_RATE: u32 = 44_100;

/// Channel count of every intermediate audio stream.
pub const CHANNELS: u16 = 2;

/// Frames pulled from each source per mixing cycle.
pub const CHUNK_FRAMES: usize = 4096;

/// Which inputs feed the audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioMode {
    /// System loopback and microphone mixed together.
    #[default]
    SystemAndMic,
    SystemOnly,
    MicOnly,
    /// No devices are opened; the audio track is silence.
    Mute,
}

impl AudioMode {
    pub fn wants_system(self) -> bool {
        matches!(self, AudioMode::SystemAndMic | AudioMode::SystemOnly)
    }

    pub fn wants_mic(self) -> bool {
        matches!(self, AudioMode::SystemAndMic | AudioMode::MicOnly)
    }

    pub fn is_mute(self) -> bool {
        self == AudioMode::Mute
    }

    /// Sources to open, in mixing order.
    pub fn sources(self) -> Vec<AudioSourceKind> {
        let mut sources = Vec::with_capacity(2);
        if self.wants_system() {
            sources.push(AudioSourceKind::System);
        }
        if self.wants_mic() {
            sources.push(AudioSourceKind::Microphone);
        }
        sources
    }
}

impl fmt::Display for AudioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AudioMode::SystemAndMic => "system+mic",
            AudioMode::SystemOnly => "system",
            AudioMode::MicOnly => "mic",
            AudioMode::Mute => "mute",
        };
        f.write_str(name)
    }
}

impl FromStr for AudioMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system+mic" | "both" | "system_and_mic" => Ok(AudioMode::SystemAndMic),
            "system" | "system-only" | "system_only" => Ok(AudioMode::SystemOnly),
            "mic" | "mic-only" | "mic_only" => Ok(AudioMode::MicOnly),
            "mute" | "none" => Ok(AudioMode::Mute),
            _ => Err(ModelError::parse(
                "audio mode",
                s,
                "expected system+mic, system, mic, or mute",
            )),
        }
    }
}

/// A logical audio input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSourceKind {
    /// Loopback of what the system is playing.
    System,
    Microphone,
}

impl fmt::Display for AudioSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSourceKind::System => f.write_str("system"),
            AudioSourceKind::Microphone => f.write_str("microphone"),
        }
    }
}
