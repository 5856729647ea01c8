//! Google Calendar connection settings and OAuth client secrets.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Read/write access to the user's calendars.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// An OAuth 2.0 client id and secret from the Google Cloud Console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Layout of the JSON file downloaded from the Cloud Console.
///
/// Desktop clients put their values under `installed`, web clients under
/// `web`; some tools write them flat at the root.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretSection>,
    web: Option<ClientSecretSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretSection {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Reads a client secret JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read client secret file {}: {}", path.display(), e))?;
        Self::from_json(&content)
    }

    /// Parses client secret JSON in any of the supported layouts.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: ClientSecretFile = serde_json::from_str(json)
            .map_err(|e| format!("failed to parse client secret JSON: {}", e))?;

        if let Some(section) = file.installed.or(file.web) {
            return Ok(Self::new(section.client_id, section.client_secret));
        }

        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(
                "client secret file needs an 'installed' or 'web' section, or root-level client_id and client_secret"
                    .to_string(),
            ),
        }
    }

    /// Checks that the values look like a Google OAuth client.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Where the OAuth client secret comes from.
///
/// A file source is read each time the secret is needed, so a missing or
/// malformed file only matters once the token endpoint is contacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientSecret {
    Inline(OAuthCredentials),
    File(PathBuf),
}

impl ClientSecret {
    /// Produces usable credentials from this source.
    pub fn resolve(&self) -> Result<OAuthCredentials, String> {
        let credentials = match self {
            Self::Inline(credentials) => credentials.clone(),
            Self::File(path) => OAuthCredentials::from_file(path)?,
        };
        credentials
            .validate()
            .map_err(|e| format!("invalid client secret: {}", e))?;
        Ok(credentials)
    }
}

/// Remote endpoints, overridable for testing against other hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth_url: String,
    pub token_url: String,
    pub api_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            api_base: "https://www.googleapis.com/calendar/v3".to_string(),
        }
    }
}

/// Configuration for authenticating against and writing to Google Calendar.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_secret: ClientSecret,

    /// Where the credential is cached between runs.
    ///
    /// Defaults to `<data dir>/quickcal/google-token.json`.
    pub token_path: PathBuf,

    /// Calendar that receives new events.
    pub calendar_id: String,

    pub scopes: Vec<String>,

    /// Timeout applied to each HTTP request.
    pub timeout: Duration,

    /// How long to wait for the browser redirect; `None` waits forever.
    pub callback_timeout: Option<Duration>,

    /// Ports tried for the loopback redirect listener. `(0, 0)` lets the
    /// OS pick a free port.
    pub loopback_port_range: (u16, u16),

    /// Launch the system browser for consent. The URL is always printed too.
    pub open_browser: bool,

    pub endpoints: Endpoints,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;

    pub fn new(client_secret: ClientSecret) -> Self {
        Self {
            client_secret,
            token_path: Self::default_token_path(),
            calendar_id: "primary".to_string(),
            scopes: vec![CALENDAR_SCOPE.to_string()],
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            callback_timeout: Some(Duration::from_secs(Self::DEFAULT_CALLBACK_TIMEOUT_SECS)),
            loopback_port_range: (0, 0),
            open_browser: true,
            endpoints: Endpoints::default(),
        }
    }

    /// Convenience constructor for a client secret JSON file.
    pub fn from_secret_file(path: impl Into<PathBuf>) -> Self {
        Self::new(ClientSecret::File(path.into()))
    }

    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quickcal")
            .join("google-token.json")
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    pub fn with_open_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Checks settings that can be verified without touching the network.
    ///
    /// A file-based client secret is not read here.
    pub fn validate(&self) -> Result<(), String> {
        if let ClientSecret::Inline(ref credentials) = self.client_secret {
            credentials
                .validate()
                .map_err(|e| format!("invalid credentials: {}", e))?;
        }
        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }
        if self.calendar_id.trim().is_empty() {
            return Err("calendar_id must not be empty".to_string());
        }
        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err("invalid loopback port range".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline() -> ClientSecret {
        ClientSecret::Inline(OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
        ))
    }

    #[test]
    fn credentials_validation() {
        assert!(
            OAuthCredentials::new("id.apps.googleusercontent.com", "s")
                .validate()
                .is_ok()
        );
        assert!(OAuthCredentials::new("", "s").validate().is_err());
        assert!(OAuthCredentials::new("bad-id", "s").validate().is_err());
        assert!(
            OAuthCredentials::new("id.apps.googleusercontent.com", "")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn installed_layout() {
        let json = r#"{
            "installed": {
                "client_id": "desk.apps.googleusercontent.com",
                "client_secret": "desk-secret",
                "project_id": "my-project",
                "redirect_uris": ["http://localhost"]
            }
        }"#;
        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "desk.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "desk-secret");
    }

    #[test]
    fn web_and_flat_layouts() {
        let web = r#"{"web": {"client_id": "w.apps.googleusercontent.com", "client_secret": "ws"}}"#;
        assert_eq!(OAuthCredentials::from_json(web).unwrap().client_secret, "ws");

        let flat = r#"{"client_id": "f.apps.googleusercontent.com", "client_secret": "fs"}"#;
        assert_eq!(OAuthCredentials::from_json(flat).unwrap().client_secret, "fs");
    }

    #[test]
    fn malformed_secret_files() {
        assert!(OAuthCredentials::from_json("not json").unwrap_err().contains("parse"));
        assert!(
            OAuthCredentials::from_json(r#"{"other": {}}"#)
                .unwrap_err()
                .contains("client_id")
        );
    }

    #[test]
    fn file_secret_is_read_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let config = GoogleConfig::from_secret_file(&path);
        assert!(config.validate().is_ok());
        assert!(config.client_secret.resolve().unwrap_err().contains("failed to read"));

        std::fs::write(
            &path,
            r#"{"installed": {"client_id": "x.apps.googleusercontent.com", "client_secret": "y"}}"#,
        )
        .unwrap();
        assert_eq!(config.client_secret.resolve().unwrap().client_secret, "y");
    }

    #[test]
    fn defaults() {
        let config = GoogleConfig::new(inline());
        assert_eq!(config.calendar_id, "primary");
        assert_eq!(config.scopes, vec![CALENDAR_SCOPE.to_string()]);
        assert_eq!(config.loopback_port_range, (0, 0));
        assert_eq!(config.callback_timeout, Some(Duration::from_secs(300)));
        assert!(config.token_path.ends_with("quickcal/google-token.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_and_validation() {
        let config = GoogleConfig::new(inline())
            .with_calendar_id("team@example.com")
            .with_timeout(Duration::from_secs(5))
            .with_callback_timeout(None)
            .with_loopback_port_range(9000, 9010)
            .with_open_browser(false);
        assert_eq!(config.calendar_id, "team@example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.callback_timeout.is_none());
        assert!(!config.open_browser);
        assert!(config.validate().is_ok());

        assert!(GoogleConfig::new(inline()).with_scopes(vec![]).validate().is_err());
        assert!(
            GoogleConfig::new(inline())
                .with_loopback_port_range(9010, 9000)
                .validate()
                .is_err()
        );
        assert!(GoogleConfig::new(inline()).with_calendar_id(" ").validate().is_err());
    }
}
