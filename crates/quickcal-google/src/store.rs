//! File-backed credential cache.
//!
//! The credential is stored as JSON. Writes go to a sibling temp file that
//! is renamed over the target, so an interrupted write never leaves a file
//! that [`CredentialStore::load`] accepts.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::credential::Credential;
use crate::error::AuthError;

/// Loads and saves the single cached [`Credential`].
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored credential, distinguishing "absent" from "corrupt".
    pub fn try_load(&self) -> Result<Option<Credential>, AuthError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no credential file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(AuthError::store(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let credential: Credential = serde_json::from_str(&content).map_err(|e| {
            AuthError::store(format!("failed to parse {}: {}", self.path.display(), e))
        })?;

        if credential.access_token.is_empty() {
            return Err(AuthError::store(format!(
                "{} holds an empty access token",
                self.path.display()
            )));
        }

        debug!("loaded credential from {}", self.path.display());
        Ok(Some(credential))
    }

    /// Reads the stored credential.
    ///
    /// A missing, unreadable or corrupt file yields `None`, which sends the
    /// caller back through authorization.
    pub fn load(&self) -> Option<Credential> {
        self.try_load().unwrap_or_else(|e| {
            warn!("ignoring cached credential: {}", e);
            None
        })
    }

    /// Replaces the stored credential.
    pub fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AuthError::store(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let content = serde_json::to_string_pretty(credential)
            .map_err(|e| AuthError::store(format!("failed to serialize credential: {}", e)))?;

        let temp_path = self.temp_path();
        write_private(&temp_path, content.as_bytes()).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            AuthError::store(format!("failed to write {}: {}", temp_path.display(), e))
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            AuthError::store(format!("failed to replace {}: {}", self.path.display(), e))
        })?;

        info!("saved credential to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "credential".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Writes `bytes` to a fresh file readable only by the owner, then syncs it.
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
