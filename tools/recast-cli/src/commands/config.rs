//! Show or initialize the configuration file.

use recast_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, init: bool) -> anyhow::Result<()> {
    if init {
        let path = AppConfig::default().save()?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let path = config_file_path();
    if path.exists() {
        println!("# {}", path.display());
    } else {
        println!("# {} (not found, showing defaults)", path.display());
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    if let Err(e) = config.validate() {
        println!();
        println!("[WARN] {e}");
    }
    Ok(())
}
