//! Application configuration.
//!
//! The settings, watermark, and mouse-effect providers persist their values
//! here. A recording session never reads this file directly: the CLI builds
//! a session snapshot from it once, at start.

use std::path::{Path, PathBuf};

use recast_session_model::{AudioMode, FrameSize, MouseEffectSpec, WatermarkSettings};
use serde::{Deserialize, Serialize};

use crate::error::{RecastError, RecastResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Settings provider values.
    pub general: GeneralSettings,

    /// Default recording parameters.
    pub recording: RecordingSettings,

    /// Watermark provider values.
    pub watermark: WatermarkSettings,

    /// Mouse-effect provider values.
    pub mouse: MouseEffectSpec,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// General recorder behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Seconds to count down before recording starts.
    pub countdown_secs: u32,

    /// Hide the controlling UI while recording.
    pub auto_hide: bool,

    /// Directory receiving finished recordings.
    pub output_dir: PathBuf,

    /// `chrono` format string used to name finished recordings.
    pub filename_pattern: String,

    /// Keyboard shortcuts, in the host toolkit's notation.
    pub shortcuts: Shortcuts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shortcuts {
    pub start: String,
    pub pause: String,
    pub stop: String,
    pub drawing: String,
}

/// Recording parameters snapshotted into every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    /// Target frame rate, 30 or 60.
    pub fps: u32,

    /// Output frame size.
    pub frame_size: FrameSize,

    /// Which audio inputs to record.
    pub audio_mode: AudioMode,

    /// System loopback gain in percent, `[0, 100]`.
    pub system_volume: u8,

    /// Microphone gain in percent, `[0, 100]`.
    pub mic_volume: u8,

    /// Run the noise-reduction chain on the mixed audio.
    pub noise_reduction: bool,

    /// Noise-reduction strength in `[0.0, 1.0]`.
    pub noise_strength: f32,

    /// Consecutive failed screen grabs tolerated before the session
    /// reports the display as unavailable.
    pub capture_miss_tolerance: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "recast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

/// Frame rates the encoder pipeline is tuned for.
pub const SUPPORTED_FPS: [u32; 2] = [30, 60];

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            countdown_secs: 3,
            auto_hide: true,
            output_dir: default_output_dir(),
            filename_pattern: "%Y%m%d_%H%M%S.mp4".to_string(),
            shortcuts: Shortcuts::default(),
        }
    }
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            start: "Ctrl+R".to_string(),
            pause: "Ctrl+P".to_string(),
            stop: "Ctrl+S".to_string(),
            drawing: "Ctrl+D".to_string(),
        }
    }
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            frame_size: FrameSize::FULL_HD,
            audio_mode: AudioMode::SystemAndMic,
            system_volume: 100,
            mic_volume: 100,
            noise_reduction: false,
            noise_strength: 0.5,
            capture_miss_tolerance: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl RecordingSettings {
    /// Reject values the capture pipeline cannot honour.
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
        if self.system_volume > 100 || self.mic_volume > 100 {
            return Err(RecastError::config(format!(
                "volumes must be within [0, 100], got system={} mic={}",
                self.system_volume, self.mic_volume
            )));
        }
        if !(0.0..=1.0).contains(&self.noise_strength) {
            return Err(RecastError::config(format!(
                "noise strength must be within [0, 1], got {}",
                self.noise_strength
            )));
        }
        Ok(())
    }
}

impl GeneralSettings {
    /// Output file name for a recording started at `now`.
    pub fn file_name_at<Tz>(&self, now: &chrono::DateTime<Tz>) -> String
    where
        Tz: chrono::TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let name = now.format(&self.filename_pattern).to_string();
        if Path::new(&name).extension().is_some() {
            name
        } else {
            format!("{name}.mp4")
        }
    }

    /// Output path for a recording started now, creating the output
    /// directory if needed.
    pub fn next_output_path(&self) -> RecastResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(self
            .output_dir
            .join(self.file_name_at(&chrono::Local::now())))
    }
}

impl AppConfig {
    /// Validate every section the recorder reads at session start.
    pub fn validate(&self) -> RecastResult<()> {
        self.recording.validate()?;
        if !(0.0..=1.0).contains(&self.watermark.opacity) {
            return Err(RecastError::config(format!(
                "watermark opacity must be within [0, 1], got {}",
                self.watermark.opacity
            )));
        }
        if self.general.filename_pattern.trim().is_empty() {
            return Err(RecastError::config("filename pattern is empty"));
        }
        Ok(())
    }

    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from `path`, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> RecastResult<PathBuf> {
        let path = config_file_path();
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to `path`.
    pub fn save_to(&self, path: &Path) -> RecastResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    base.join("recast").join("config.json")
}

/// Default recordings directory.
fn default_output_dir() -> PathBuf {
    home_dir().join("Videos").join("ScreenRecords")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_recording_settings_are_valid() {
        RecordingSettings::default().validate().unwrap();
    }

    #[test]
    fn validate_rejects_unsupported_fps_and_ranges() {
        let bad_fps = RecordingSettings {
            fps: 24,
            ..Default::default()
        };
        assert!(bad_fps.validate().is_err());

        let loud = RecordingSettings {
            mic_volume: 150,
            ..Default::default()
        };
        assert!(loud.validate().is_err());

        let strong = RecordingSettings {
            noise_strength: 1.5,
            ..Default::default()
        };
        assert!(strong.validate().is_err());
    }

    #[test]
    fn app_config_rejects_out_of_range_opacity() {
        let mut config = AppConfig::default();
        config.validate().unwrap();
        config.watermark.opacity = 1.5;
        assert_eq!(config.validate().unwrap_err().kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn file_name_follows_timestamp_policy() {
        let general = GeneralSettings::default();
        let at = chrono::Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(general.file_name_at(&at), "20240309_140507.mp4");

        let bare = GeneralSettings {
            filename_pattern: "take-%H%M".to_string(),
            ..Default::default()
        };
        assert_eq!(bare.file_name_at(&at), "take-1405.mp4");
    }

    #[test]
    fn load_falls_back_to_defaults_on_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let config = AppConfig::load_from(&path);
        assert_eq!(config.recording, RecordingSettings::default());
    }

    #[test]
    fn save_then_load_preserves_provider_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.watermark.text = "demo".to_string();
        config.mouse.highlight.size = 72;
        config.recording.fps = 60;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.watermark.text, "demo");
        assert_eq!(loaded.mouse.highlight.size, 72);
        assert_eq!(loaded.recording.fps, 60);
    }
}
