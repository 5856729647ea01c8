//! Configuration commands.

use std::path::Path;

use quickcal_google::ClientSecret;

use crate::config::ClientConfig;
use crate::error::{CliError, CliResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, config_path: &Path) -> CliResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", config_path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration, including the client secret it points to.
pub fn validate(config: &ClientConfig) -> CliResult<()> {
    let google = config.google_config(None)?;
    if let ClientSecret::File(ref path) = google.client_secret {
        google.client_secret.resolve().map_err(CliError::Config)?;
        println!("Credentials file {} is valid.", path.display());
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(config_path: &Path) -> CliResult<()> {
    println!("config: {}", config_path.display());
    Ok(())
}
