//! Show or persist the effective configuration.

use clipcast_common::config::{config_file_path, RecorderConfig};

pub fn run(config: RecorderConfig, write: bool) -> anyhow::Result<()> {
    if write {
        let path = config.save()?;
        println!("Config written to: {}", path.display());
        return Ok(());
    }

    let path = config_file_path();
    let origin = if path.exists() { "file" } else { "defaults" };
    println!("# {} ({origin})", path.display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
