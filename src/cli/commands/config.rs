//! Configuration file commands.

use std::path::Path;

use crate::config::{self as app_config, Config};

/// Print the effective configuration as TOML
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Print the config file location
pub fn cmd_config_path(explicit: Option<&Path>) -> anyhow::Result<()> {
    match explicit.map(Path::to_path_buf).or_else(app_config::config_path) {
        Some(path) => println!("{}", path.display()),
        None => anyhow::bail!("Could not determine config directory"),
    }
    Ok(())
}

/// Write the effective configuration to the config file
pub fn cmd_config_init(config: &Config, explicit: Option<&Path>) -> anyhow::Result<()> {
    let path = match explicit {
        Some(path) => {
            app_config::save_to(config, path)?;
            path.to_path_buf()
        }
        None => app_config::save(config)?,
    };
    println!("Wrote {}", path.display());
    Ok(())
}
