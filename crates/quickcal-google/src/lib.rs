//! Google Calendar access for quickcal.
//!
//! This crate owns everything that talks to Google:
//!
//! - [`CredentialStore`]: the cached OAuth credential on disk
//! - [`OAuthClient`]: PKCE loopback authorization and token refresh
//! - [`Authenticator`]: single-flight session object handing out [`ClientHandle`]s
//! - [`GoogleCalendarClient`]: the `events.insert` call
//! - [`SyncClient`]: submits a payload through a handle and classifies the result
//! - [`AddEventDialog`]: validate, authorize, submit, one dialog at a time
//!
//! # Example
//!
//! ```ignore
//! use quickcal_core::DraftInputs;
//! use quickcal_google::{AddEventDialog, Authenticator, GoogleConfig};
//!
//! let config = GoogleConfig::from_secret_file("~/credentials.json");
//! let authenticator = Authenticator::new(config)?;
//!
//! let mut dialog = AddEventDialog::new(&authenticator);
//! dialog.confirm(&DraftInputs::new("Standup", start, duration)).await?;
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod authenticator;
pub mod client;
pub mod config;
pub mod credential;
pub mod dialog;
pub mod error;
pub mod oauth;
pub mod store;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use authenticator::{Authenticator, ClientHandle};
pub use client::{CalendarApi, GoogleCalendarClient, InsertedEvent};
pub use config::{CALENDAR_SCOPE, ClientSecret, Endpoints, GoogleConfig, OAuthCredentials};
pub use credential::{Credential, CredentialState, TokenGrant};
pub use dialog::AddEventDialog;
pub use error::{AddEventError, AuthError, AuthErrorKind, SubmissionError, SubmissionErrorKind};
pub use oauth::{OAuthClient, OAuthFlow};
pub use store::CredentialStore;
pub use sync::{SubmissionResult, SyncClient};

/// A boxed future for the object-safe traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
