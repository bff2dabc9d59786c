//! Record the screen until Ctrl+C or `--duration`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use recast_capture_engine::{MuxOutcome, RecordingSession, SessionConfig, SessionReport, SystemBackend};
use recast_common::config::AppConfig;

use crate::RecordArgs;

pub async fn run(mut config: AppConfig, args: RecordArgs) -> anyhow::Result<()> {
    apply_overrides(&mut config, &args);
    config.validate()?;

    let output = match args.output.clone() {
        Some(path) => path,
        None => config.general.next_output_path()?,
    };
    let session_config = SessionConfig::from_settings(
        &config.recording,
        &config.watermark,
        &config.mouse,
        args.region,
        output.clone(),
    );

    let recording = &config.recording;
    println!("Recording to: {}", output.display());
    println!(
        "  {} @ {} fps, audio: {}",
        recording.frame_size, recording.fps, recording.audio_mode
    );
    if let Some(region) = args.region {
        println!(
            "  Region: {}x{} at ({}, {})",
            region.width, region.height, region.left, region.top
        );
    }
    if recording.noise_reduction {
        println!("  Noise reduction: {:.2}", recording.noise_strength);
    }
    println!();

    if !args.no_countdown {
        countdown(config.general.countdown_secs).await;
    }

    tracing::info!(
        output = %output.display(),
        fps = recording.fps,
        audio = %recording.audio_mode,
        region = ?args.region,
        "Starting recording from CLI"
    );

    let mut session = RecordingSession::new(session_config, Arc::new(SystemBackend::new()));
    let mut session = tokio::task::spawn_blocking(move || {
        session.start().map(|()| session)
    })
    .await
    .context("recording start task failed")??;

    match args.duration {
        Some(secs) => {
            println!("Recording for {secs}s (Ctrl+C to stop early)...");
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                result = tokio::signal::ctrl_c() => result?,
            }
        }
        None => {
            println!("Recording... press Ctrl+C to stop");
            tokio::signal::ctrl_c().await?;
        }
    }
    println!();
    println!("Stopping...");
    tracing::info!("Stop requested");

    let report = tokio::task::spawn_blocking(move || session.stop())
        .await
        .context("recording stop task failed")??;
    match report {
        Some(report) => {
            tracing::info!(
                mux = ?report.mux,
                faults = report.faults.len(),
                "Recording finished"
            );
            print_report(&report);
        }
        None => {
            tracing::warn!("Stop returned no report");
            println!("Nothing was recorded.");
        }
    }
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &RecordArgs) {
    let recording = &mut config.recording;
    if let Some(fps) = args.fps {
        recording.fps = fps;
    }
    if let Some(size) = args.size {
        recording.frame_size = size;
    }
    if let Some(audio) = args.audio {
        recording.audio_mode = audio.into();
    }
    if let Some(volume) = args.system_volume {
        recording.system_volume = volume;
    }
    if let Some(volume) = args.mic_volume {
        recording.mic_volume = volume;
    }
    if args.denoise {
        recording.noise_reduction = true;
    }
    if let Some(strength) = args.denoise_strength {
        recording.noise_reduction = true;
        recording.noise_strength = strength;
    }
}

async fn countdown(secs: u32) {
    for remaining in (1..=secs).rev() {
        println!("Starting in {remaining}...");
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

fn print_report(report: &SessionReport) {
    match (&report.output, report.mux) {
        (Some(path), MuxOutcome::Combined) => println!("Recording saved to: {}", path.display()),
        (Some(path), _) => println!(
            "Recording saved without audio to: {}",
            path.display()
        ),
        (None, _) => println!("Recording could not be saved."),
    }
    let stats = &report.stats;
    println!(
        "  Duration: {:.1}s, frames: {} ({} repeated), audio chunks: {}",
        report.duration.as_secs_f64(),
        stats.frames_written(),
        stats.frames_reemitted,
        stats.chunks_written
    );
    if stats.dsp_passthroughs > 0 {
        println!("  Noise reduction skipped on {} chunks", stats.dsp_passthroughs);
    }
    for fault in &report.faults {
        println!("  [WARN] {fault}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AudioArg;
    use recast_session_model::{AudioMode, FrameSize};

    #[test]
    fn flags_override_config_values() {
        let mut config = AppConfig::default();
        let args = RecordArgs {
            fps: Some(60),
            size: Some(FrameSize::HD),
            audio: Some(AudioArg::Mute),
            denoise_strength: Some(0.8),
            ..Default::default()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.recording.fps, 60);
        assert_eq!(config.recording.frame_size, FrameSize::HD);
        assert_eq!(config.recording.audio_mode, AudioMode::Mute);
        assert!(config.recording.noise_reduction);
        assert_eq!(config.recording.noise_strength, 0.8);
        assert_eq!(config.recording.mic_volume, 100);
    }

    #[test]
    fn out_of_range_strength_fails_validation() {
        let mut config = AppConfig::default();
        let args = RecordArgs {
            denoise_strength: Some(2.0),
            ..Default::default()
        };
        apply_overrides(&mut config, &args);
        assert!(config.validate().is_err());
    }
}
