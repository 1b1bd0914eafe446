//! Config command implementation.
//!
//! Writes the default configuration, or shows the effective one.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::cli::ConfigFormat;
use crate::config::Config;

/// Serializes a configuration in the requested format.
pub fn render_config(config: &Config, format: &ConfigFormat) -> Result<String> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Generates the default configuration file, or prints it when no output is given.
pub fn command_config(output: Option<&Path>, format: &ConfigFormat) -> Result<()> {
    let rendered = render_config(&Config::default(), format)?;

    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write config to {}", path.display()))?;
            info!("Configuration written to {}", path.display());
            println!("Configuration written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Prints the effective configuration.
pub fn show_config(config: &Config, format: &ConfigFormat) -> Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;

    #[test]
    fn test_generated_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        for (name, format) in [
            ("c.yaml", ConfigFormat::Yaml),
            ("c.json", ConfigFormat::Json),
            ("c.toml", ConfigFormat::Toml),
        ] {
            let path = dir.path().join(name);
            command_config(Some(path.as_path()), &format).unwrap();
            let cfg = load_config(Some(path.as_path())).unwrap();
            assert_eq!(cfg.listing_command, Config::default().listing_command);
            assert_eq!(cfg.stale_after_secs, Some(5));
        }
    }
}
