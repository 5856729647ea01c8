//! `quickcal auth`.

use std::path::{Path, PathBuf};

use quickcal_google::Authenticator;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{CliError, CliResult};

/// Makes sure a usable credential is cached, running the browser flow if
/// needed (or always, with `force`).
///
/// A credentials file given on the command line is recorded in
/// `config.toml` once authorization succeeds.
pub async fn auth(
    credentials_file: Option<PathBuf>,
    force: bool,
    config: &ClientConfig,
    config_path: &Path,
) -> CliResult<()> {
    let authenticator = Authenticator::new(config.google_config(credentials_file.as_deref())?)?;

    if force {
        println!("Starting Google Calendar authorization...");
        authenticator.reauthorize().await?;
    } else {
        authenticator.get_client().await?;
    }

    info!("Google authorization successful");
    println!(
        "Authorized. Credential stored in {}",
        authenticator.store().path().display()
    );

    if let Some(path) = credentials_file {
        match record_credentials_file(config_path, &path) {
            Ok(()) => println!("Credentials file recorded in {}", config_path.display()),
            Err(e) => warn!("could not record credentials file: {}", e),
        }
    }

    Ok(())
}

/// Points `[google] credentials_file` at `credentials_file`, keeping the
/// rest of the document and its formatting.
///
/// Inline `client_id` / `client_secret` would take precedence over the
/// file, so they are removed.
pub fn record_credentials_file(config_path: &Path, credentials_file: &Path) -> CliResult<()> {
    let content = match std::fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let mut doc = content.parse::<toml_edit::DocumentMut>().map_err(|e| {
        CliError::Config(format!("failed to parse {}: {}", config_path.display(), e))
    })?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let google = doc["google"].as_table_mut().ok_or_else(|| {
        CliError::Config(format!("`google` in {} is not a table", config_path.display()))
    })?;

    let absolute = std::path::absolute(credentials_file)?;
    google["credentials_file"] = toml_edit::value(absolute.to_string_lossy().into_owned());
    let removed_id = google.remove("client_id").is_some();
    let removed_secret = google.remove("client_secret").is_some();
    if removed_id || removed_secret {
        info!("replaced inline client credentials with the credentials file");
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, doc.to_string())?;
    Ok(())
}
