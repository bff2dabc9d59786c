//! Recast CLI: screen recording with mixed audio from the command line.
//!
//! Usage:
//!   recast record [OPTIONS]    Record until Ctrl+C (or --duration)
//!   recast check               Check ffmpeg, GStreamer, displays, and audio
//!   recast devices             List audio input devices
//!   recast config [--init]     Show (or write) the effective config

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use recast_session_model::{AudioMode, CaptureRect, FrameSize};

mod commands;

#[derive(Parser)]
#[command(
    name = "recast",
    about = "Screen recorder with overlays, mixed audio, and noise reduction",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record the screen
    Record(RecordArgs),

    /// Check system capabilities
    Check,

    /// List audio input devices
    Devices,

    /// Show the effective configuration
    Config {
        /// Write the default configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

/// Flag overrides for one recording. Unset flags keep the config value.
#[derive(clap::Args, Debug, Default)]
pub struct RecordArgs {
    /// Target FPS (30 or 60)
    #[arg(long)]
    pub fps: Option<u32>,

    /// Output frame size, WIDTHxHEIGHT
    #[arg(long)]
    pub size: Option<FrameSize>,

    /// Capture rectangle, TOP,LEFT,WIDTH,HEIGHT (default: primary display)
    #[arg(long)]
    pub region: Option<CaptureRect>,

    /// Audio inputs to record
    #[arg(long, value_enum)]
    pub audio: Option<AudioArg>,

    /// System audio volume, 0-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub system_volume: Option<u8>,

    /// Microphone volume, 0-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub mic_volume: Option<u8>,

    /// Enable noise reduction
    #[arg(long)]
    pub denoise: bool,

    /// Noise reduction strength [0.0, 1.0]
    #[arg(long)]
    pub denoise_strength: Option<f32>,

    /// Output file (default: output directory + filename pattern)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop automatically after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Skip the countdown
    #[arg(long)]
    pub no_countdown: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AudioArg {
    /// System audio and microphone
    Both,
    /// System audio only
    System,
    /// Microphone only
    Mic,
    /// No audio devices; silent track
    Mute,
}

impl From<AudioArg> for AudioMode {
    fn from(arg: AudioArg) -> Self {
        match arg {
            AudioArg::Both => AudioMode::SystemAndMic,
            AudioArg::System => AudioMode::SystemOnly,
            AudioArg::Mic => AudioMode::MicOnly,
            AudioArg::Mute => AudioMode::Mute,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = recast_common::config::AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    recast_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Record(args) => commands::record::run(config, args).await,
        Commands::Check => commands::check::run(),
        Commands::Devices => commands::devices::run(),
        Commands::Config { init } => commands::config::run(&config, init),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_and_region_flags_parse() {
        let cli = Cli::try_parse_from([
            "recast", "record", "--size", "1280x720", "--region", "10,20,800,600",
        ])
        .unwrap();
        let Commands::Record(args) = cli.command else {
            panic!("expected record");
        };
        assert_eq!(args.size, Some(FrameSize::HD));
        assert_eq!(args.region, Some(CaptureRect::new(10, 20, 800, 600)));

        assert!(Cli::try_parse_from(["recast", "record", "--size", "0x720"]).is_err());
        assert!(Cli::try_parse_from(["recast", "record", "--region", "10,20,800"]).is_err());
    }

    #[test]
    fn record_flags_map_onto_overrides() {
        let cli = Cli::try_parse_from([
            "recast", "record", "--fps", "60", "--audio", "mic", "--mic-volume", "40",
            "--denoise", "--duration", "5",
        ])
        .unwrap();
        let Commands::Record(args) = cli.command else {
            panic!("expected record");
        };
        assert_eq!(args.fps, Some(60));
        assert_eq!(args.audio.map(AudioMode::from), Some(AudioMode::MicOnly));
        assert_eq!(args.mic_volume, Some(40));
        assert!(args.denoise);
        assert_eq!(args.duration, Some(5));

        assert!(Cli::try_parse_from(["recast", "record", "--mic-volume", "150"]).is_err());
    }
}
