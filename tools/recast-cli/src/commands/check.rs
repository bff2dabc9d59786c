//! Check system capabilities.

use recast_capture_engine::backend::{audio_source, frame_source, video_sink, FfmpegMuxer};

pub fn run() -> anyhow::Result<()> {
    println!("Recast System Check");
    println!("{}", "=".repeat(50));
    let mut ready = true;

    let ffmpeg = FfmpegMuxer::default();
    if ffmpeg.is_available() {
        println!("[OK] ffmpeg found");
    } else {
        ready = false;
        println!("[FAIL] ffmpeg not found on PATH (needed for the final mux)");
    }

    match video_sink::missing_elements() {
        Ok(missing) if missing.is_empty() => println!("[OK] GStreamer elements available"),
        Ok(missing) => {
            ready = false;
            println!("[FAIL] GStreamer elements missing: {}", missing.join(", "));
        }
        Err(e) => {
            ready = false;
            println!("[FAIL] GStreamer unavailable: {e}");
        }
    }

    match frame_source::list_monitors() {
        Ok(monitors) if !monitors.is_empty() => {
            println!("[OK] Monitors detected: {}", monitors.len());
            for m in &monitors {
                println!(
                    "     {} {}x{} at ({}, {}) (scale: {}x) {}",
                    m.name,
                    m.bounds.width,
                    m.bounds.height,
                    m.bounds.left,
                    m.bounds.top,
                    m.scale_factor,
                    if m.is_primary { "(primary)" } else { "" }
                );
            }
        }
        Ok(_) => {
            ready = false;
            println!("[FAIL] No monitors detected");
        }
        Err(e) => {
            ready = false;
            println!("[FAIL] Screen capture unavailable: {e}");
        }
    }

    match audio_source::list_input_devices() {
        Ok(devices) => {
            let loopback = devices.iter().filter(|d| d.is_loopback).count();
            println!(
                "[OK] Audio inputs: {} ({} loopback)",
                devices.len(),
                loopback
            );
            if loopback == 0 {
                println!("[WARN] No loopback input; system audio will use the default output device");
            }
        }
        Err(e) => println!("[WARN] Audio devices unavailable: {e}"),
    }

    println!();
    if ready {
        println!("All required capabilities are available. Recast is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }
    Ok(())
}
