//! Show or write the effective configuration.

use std::path::Path;

use reelforge_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, config_path: Option<&Path>, init: bool) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);

    if init {
        let path = match config_path {
            Some(path) => {
                config.save_to(path)?;
                path.to_path_buf()
            }
            None => {
                config.save()?;
                config_file_path()
            }
        };
        println!("Config written to {}", path.display());
    }
    Ok(())
}
