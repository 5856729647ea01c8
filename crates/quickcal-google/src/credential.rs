//! The OAuth credential and the token endpoint's answers.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Access tokens are treated as expired this long before the server says so.
pub const EXPIRY_MARGIN: Duration = Duration::seconds(60);

/// What the token endpoint returns for both code exchange and refresh.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Space-separated scopes actually granted.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenGrant {
    pub fn new(access_token: impl Into<String>, expires_in: Option<i64>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_in,
            scope: None,
        }
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// A lifetime too large to represent is treated like a missing one.
    fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in
            .and_then(|secs| Duration::try_seconds(secs.max(0)))
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .and_then(|expiry| expiry.checked_sub_signed(EXPIRY_MARGIN))
    }

    fn granted_scopes(&self) -> Option<BTreeSet<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(String::from).collect())
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// How usable a credential is at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// The access token can be used as-is.
    Valid,
    /// Expired, but a refresh token is available.
    Refreshable,
    /// Expired with no way to renew it.
    Unusable,
}

/// Token bundle authorizing calendar access on the user's behalf.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// `None` means the server did not report an expiry.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: BTreeSet<String>,
    pub last_refresh: DateTime<Utc>,
}

impl Credential {
    /// Builds a credential from a code-exchange grant.
    ///
    /// If the server does not echo the granted scopes, the requested ones
    /// are recorded.
    pub fn from_grant(grant: TokenGrant, requested_scopes: &[String], now: DateTime<Utc>) -> Self {
        let scopes = grant
            .granted_scopes()
            .unwrap_or_else(|| requested_scopes.iter().cloned().collect());
        Self {
            expires_at: grant.expires_at(now),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            scopes,
            last_refresh: now,
        }
    }

    /// Applies a refresh grant in place.
    ///
    /// Google usually omits the refresh token on refresh; the existing one
    /// is kept in that case.
    pub fn apply_refresh(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        self.expires_at = grant.expires_at(now);
        if let Some(scopes) = grant.granted_scopes() {
            self.scopes = scopes;
        }
        if grant.refresh_token.is_some() {
            self.refresh_token = grant.refresh_token;
        }
        self.access_token = grant.access_token;
        self.last_refresh = now;
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> CredentialState {
        if !self.is_expired_at(now) {
            CredentialState::Valid
        } else if self.refresh_token.is_some() {
            CredentialState::Refreshable
        } else {
            CredentialState::Unusable
        }
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .field("last_refresh", &self.last_refresh)
            .finish()
    }
}
