//! List audio input devices.

use recast_capture_engine::backend::audio_source;

pub fn run() -> anyhow::Result<()> {
    let devices = audio_source::list_input_devices()?;
    if devices.is_empty() {
        println!("No audio input devices found.");
        return Ok(());
    }
    println!("Audio input devices:");
    for device in &devices {
        let mut tags = Vec::new();
        if device.is_default {
            tags.push("default");
        }
        if device.is_loopback {
            tags.push("loopback");
        }
        if tags.is_empty() {
            println!("  {}", device.name);
        } else {
            println!("  {} ({})", device.name, tags.join(", "));
        }
    }
    Ok(())
}
