//! CLI error types.

use quickcal_google::{AddEventError, AuthError};
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by the `quickcal` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    /// Arguments that parse but do not make sense together.
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    AddEvent(#[from] AddEventError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
