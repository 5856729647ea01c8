//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/quickcal/config.toml` by default.
//!
//! The OAuth client comes either from a Cloud Console JSON file
//! (`credentials_file`) or from inline `client_id` / `client_secret` values.
//! Inline values support secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use quickcal_google::{ClientSecret, GoogleConfig, OAuthCredentials};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Configuration for the quickcal CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Google Calendar settings.
    pub google: Option<GoogleSettings>,
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickcal")
    }

    /// Builds the Google settings, applying a command-line credentials file
    /// over whatever the file says.
    pub fn google_config(&self, credentials_file: Option<&Path>) -> CliResult<GoogleConfig> {
        let mut settings = self.google.clone().unwrap_or_default();
        if let Some(path) = credentials_file {
            settings.credentials_file = Some(path.to_path_buf());
            settings.client_id = None;
            settings.client_secret = None;
        }
        settings.to_google_config().map_err(CliError::Config)
    }
}

/// Google Calendar settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Cloud Console credentials JSON. `~/` is expanded.
    pub credentials_file: Option<PathBuf>,

    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Path to token storage.
    pub token_path: Option<PathBuf>,

    /// Calendar that receives new events.
    pub calendar_id: String,

    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,

    /// Seconds to wait for the browser redirect; 0 waits indefinitely.
    pub callback_timeout_secs: u64,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            credentials_file: None,
            client_id: None,
            client_secret: None,
            token_path: None,
            calendar_id: "primary".to_string(),
            timeout_secs: GoogleConfig::DEFAULT_TIMEOUT_SECS,
            callback_timeout_secs: GoogleConfig::DEFAULT_CALLBACK_TIMEOUT_SECS,
        }
    }
}

impl GoogleSettings {
    /// Converts to provider configuration.
    pub fn to_google_config(&self) -> Result<GoogleConfig, String> {
        let mut config = GoogleConfig::new(self.client_secret_source()?)
            .with_calendar_id(self.calendar_id.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_callback_timeout(
                Some(self.callback_timeout_secs)
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs),
            );

        if let Some(ref path) = self.token_path {
            config = config.with_token_path(expand_home(path));
        }

        config.validate()?;
        Ok(config)
    }

    /// Picks the client secret source.
    ///
    /// Inline values win when both are present; otherwise the credentials
    /// file is used. The file itself is not read here.
    pub fn client_secret_source(&self) -> Result<ClientSecret, String> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => {
                let id = crate::secret::resolve(id)
                    .map_err(|e| format!("failed to resolve client_id: {}", e))?;
                let secret = crate::secret::resolve(secret)
                    .map_err(|e| format!("failed to resolve client_secret: {}", e))?;
                return Ok(ClientSecret::Inline(OAuthCredentials::new(id, secret)));
            }
            (Some(_), None) => {
                return Err("client_secret is missing from [google] section in config.toml".to_string());
            }
            (None, Some(_)) => {
                return Err("client_id is missing from [google] section in config.toml".to_string());
            }
            (None, None) => {}
        }

        match self.credentials_file {
            Some(ref path) => Ok(ClientSecret::File(expand_home(path))),
            None => Err(format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 credentials_file = \"~/credentials.json\"\n\n  \
                 Or run: quickcal auth --credentials-file <path>",
                ClientConfig::default_path().display()
            )),
        }
    }
}

/// Expands a leading `~/` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
