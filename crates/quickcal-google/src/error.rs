//! Error types for authentication and event submission.
//!
//! Every failure in this crate is reported as a value. Callers match on the
//! variant (or its [`kind`](AuthError::kind)) rather than on message text;
//! the `Display` output is the message shown to the user.

use quickcal_core::{DialogState, ValidationError};
use thiserror::Error;

/// Why a client handle could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The interactive authorization flow failed: denied, timed out,
    /// unreachable, or the client secret configuration is unusable.
    #[error("authorization failed: {0}")]
    FlowFailed(String),

    /// The token endpoint refused or could not process a refresh.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// The credential file exists but cannot be read or written.
    #[error("credential store error: {0}")]
    StoreCorrupt(String),
}

/// Discriminant of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    FlowFailed,
    RefreshFailed,
    StoreCorrupt,
}

impl AuthError {
    pub fn flow(message: impl Into<String>) -> Self {
        Self::FlowFailed(message.into())
    }

    pub fn refresh(message: impl Into<String>) -> Self {
        Self::RefreshFailed(message.into())
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreCorrupt(message.into())
    }

    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::FlowFailed(_) => AuthErrorKind::FlowFailed,
            Self::RefreshFailed(_) => AuthErrorKind::RefreshFailed,
            Self::StoreCorrupt(_) => AuthErrorKind::StoreCorrupt,
        }
    }
}

/// Why an event insert did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// No authenticated client was available.
    #[error("Google service not initialized")]
    ServiceUnavailable,

    /// The API answered with an error.
    #[error("Google API Error: {0}")]
    RemoteRejected(String),

    /// The request never got a usable answer.
    #[error("Google API Error: {0}")]
    Transport(String),
}

/// Discriminant of a [`SubmissionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionErrorKind {
    ServiceUnavailable,
    RemoteRejected,
    Transport,
}

impl SubmissionError {
    pub fn kind(&self) -> SubmissionErrorKind {
        match self {
            Self::ServiceUnavailable => SubmissionErrorKind::ServiceUnavailable,
            Self::RemoteRejected(_) => SubmissionErrorKind::RemoteRejected,
            Self::Transport(_) => SubmissionErrorKind::Transport,
        }
    }

    /// Returns the underlying cause text, if any.
    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::ServiceUnavailable => None,
            Self::RemoteRejected(msg) | Self::Transport(msg) => Some(msg),
        }
    }
}

/// Any failure of a single "add event" attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddEventError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// The dialog was asked to do something its state does not allow.
    #[error("dialog is {0}")]
    Dialog(DialogState),
}

impl AddEventError {
    /// Returns `true` if the user can fix the input and try again.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Dialog(_))
    }
}
