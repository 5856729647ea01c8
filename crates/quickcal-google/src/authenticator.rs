//! Session object owning the credential and the bound API client.
//!
//! An [`Authenticator`] is created once per process and passed by reference
//! to everything that needs calendar access. [`Authenticator::get_client`]
//! is single-flight: concurrent callers wait on one mutex, so at most one
//! refresh or browser consent runs at a time.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::{CalendarApi, GoogleCalendarClient};
use crate::config::GoogleConfig;
use crate::credential::{Credential, CredentialState};
use crate::error::AuthError;
use crate::oauth::{OAuthClient, OAuthFlow};
use crate::store::CredentialStore;

/// Cheap, cloneable handle to an authorized calendar API client.
#[derive(Clone)]
pub struct ClientHandle {
    api: Arc<dyn CalendarApi>,
    expires_at: Option<DateTime<Utc>>,
}

impl ClientHandle {
    /// Wraps an API implementation that never expires.
    pub fn from_api(api: Arc<dyn CalendarApi>) -> Self {
        Self {
            api,
            expires_at: None,
        }
    }

    pub fn api(&self) -> &dyn CalendarApi {
        self.api.as_ref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Credential owned by the authenticator plus the client bound to it.
struct Session {
    credential: Credential,
    handle: ClientHandle,
}

/// Produces authorized [`ClientHandle`]s, refreshing or re-authorizing as
/// needed.
pub struct Authenticator<F = OAuthClient> {
    config: GoogleConfig,
    store: CredentialStore,
    flow: F,
    session: Mutex<Option<Session>>,
}

impl Authenticator<OAuthClient> {
    pub fn new(config: GoogleConfig) -> Result<Self, AuthError> {
        let flow = OAuthClient::new(&config)?;
        Ok(Self::with_flow(config, flow))
    }
}

impl<F: OAuthFlow> Authenticator<F> {
    /// Creates an authenticator using a custom OAuth implementation.
    pub fn with_flow(config: GoogleConfig, flow: F) -> Self {
        let store = CredentialStore::new(&config.token_path);
        Self {
            config,
            store,
            flow,
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Returns an authorized client handle.
    ///
    /// The handle is cached for as long as its access token is valid. On a
    /// miss the credential held in memory (or else the stored one) is used,
    /// refreshed, or replaced by running the interactive flow, in that order
    /// of preference.
    pub async fn get_client(&self) -> Result<ClientHandle, AuthError> {
        let mut session = self.session.lock().await;
        if let Some(current) = session.as_ref().filter(|s| s.handle.is_valid_at(Utc::now())) {
            debug!("reusing cached client handle");
            return Ok(current.handle.clone());
        }

        let held = session.take().map(|s| s.credential);
        let credential = self.acquire(held).await?;
        let handle = self.bind(&credential)?;
        *session = Some(Session {
            credential,
            handle: handle.clone(),
        });
        Ok(handle)
    }

    /// Runs the interactive flow even if a usable credential exists.
    pub async fn reauthorize(&self) -> Result<ClientHandle, AuthError> {
        let mut session = self.session.lock().await;
        let credential = self.authorize().await?;
        let handle = self.bind(&credential)?;
        *session = Some(Session {
            credential,
            handle: handle.clone(),
        });
        Ok(handle)
    }

    async fn acquire(&self, held: Option<Credential>) -> Result<Credential, AuthError> {
        let Some(credential) = held.or_else(|| self.store.load()) else {
            info!("no stored credential, starting authorization");
            return self.authorize().await;
        };

        if !credential.has_scopes(&self.config.scopes) {
            info!("stored credential lacks the calendar scope, re-authorizing");
            return self.authorize().await;
        }

        match credential.state_at(Utc::now()) {
            CredentialState::Valid => {
                debug!("stored credential is valid");
                Ok(credential)
            }
            CredentialState::Refreshable => match self.refresh(credential).await {
                Ok(refreshed) => Ok(refreshed),
                Err(e) => {
                    warn!("{}, falling back to authorization", e);
                    self.authorize().await
                }
            },
            CredentialState::Unusable => {
                info!("stored credential expired without a refresh token");
                self.authorize().await
            }
        }
    }

    async fn refresh(&self, mut credential: Credential) -> Result<Credential, AuthError> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or_else(|| AuthError::refresh("no refresh token"))?;

        let grant = self.flow.refresh(&refresh_token).await?;
        credential.apply_refresh(grant, Utc::now());
        self.persist(&credential);
        Ok(credential)
    }

    async fn authorize(&self) -> Result<Credential, AuthError> {
        let credential = self.flow.authorize(&self.config.scopes).await?;
        info!("authorization completed");
        self.persist(&credential);
        Ok(credential)
    }

    fn persist(&self, credential: &Credential) {
        if let Err(e) = self.store.save(credential) {
            warn!("keeping credential in memory only: {}", e);
        }
    }

    fn bind(&self, credential: &Credential) -> Result<ClientHandle, AuthError> {
        let client = GoogleCalendarClient::new(
            credential.access_token.clone(),
            self.config.endpoints.api_base.clone(),
            self.config.timeout,
        )
        .map_err(|e| AuthError::flow(format!("failed to create HTTP client: {}", e)))?;

        Ok(ClientHandle {
            api: Arc::new(client),
            expires_at: credential.expires_at,
        })
    }
}

impl<F> fmt::Debug for Authenticator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("store", &self.store)
            .field("calendar_id", &self.config.calendar_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CALENDAR_SCOPE;
    use crate::credential::TokenGrant;
    use crate::test_support::{FakeFlow, config};
    use chrono::Duration;

    fn stored(access: &str, issued: DateTime<Utc>, refresh: Option<&str>) -> Credential {
        let mut grant = TokenGrant::new(access, Some(3600));
        grant.refresh_token = refresh.map(String::from);
        Credential::from_grant(grant, &[CALENDAR_SCOPE.to_string()], issued)
    }

    fn expired(refresh: Option<&str>) -> Credential {
        stored("stale-access", Utc::now() - Duration::hours(2), refresh)
    }

    impl Authenticator<FakeFlow> {
        pub(crate) fn flow_counts(&self) -> (usize, usize) {
            self.flow.counts()
        }
    }

    #[tokio::test]
    async fn absent_credential_runs_flow_once() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authenticator::with_flow(config(&dir), FakeFlow::default());

        let first = auth.get_client().await.unwrap();
        let second = auth.get_client().await.unwrap();

        assert_eq!(auth.flow_counts(), (1, 0));
        assert!(Arc::ptr_eq(&first.api, &second.api));
        let saved = auth.store().load().unwrap();
        assert_eq!(saved.access_token, "fresh-access");
        assert_eq!(saved.refresh_token.as_deref(), Some("fresh-refresh"));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_flow() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authenticator::with_flow(config(&dir), FakeFlow::default());

        let (a, b) = tokio::join!(auth.get_client(), auth.get_client());
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(auth.flow_counts(), (1, 0));
    }

    #[tokio::test]
    async fn valid_credential_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authenticator::with_flow(config(&dir), FakeFlow::default());
        let credential = stored("stored-access", Utc::now(), Some("stored-refresh"));
        auth.store().save(&credential).unwrap();

        let handle = auth.get_client().await.unwrap();
        assert_eq!(auth.flow_counts(), (0, 0));
        assert_eq!(handle.expires_at(), credential.expires_at);
    }

    #[tokio::test]
    async fn expired_credential_is_refreshed_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authenticator::with_flow(config(&dir), FakeFlow::default());
        auth.store().save(&expired(Some("stored-refresh"))).unwrap();

        auth.get_client().await.unwrap();

        assert_eq!(auth.flow_counts(), (0, 1));
        let saved = auth.store().load().unwrap();
        assert_eq!(saved.access_token, "refreshed-access");
        assert_eq!(saved.refresh_token.as_deref(), Some("stored-refresh"));
        assert!(!saved.is_expired());
    }

    #[tokio::test]
    async fn failed_refresh_falls_back_to_flow() {
        let dir = tempfile::tempdir().unwrap();
        let flow = FakeFlow {
            refresh_rejected: true,
            ..Default::default()
        };
        let auth = Authenticator::with_flow(config(&dir), flow);
        auth.store().save(&expired(Some("stored-refresh"))).unwrap();

        auth.get_client().await.unwrap();

        assert_eq!(auth.flow_counts(), (1, 1));
        assert_eq!(auth.store().load().unwrap().access_token, "fresh-access");
    }

    #[tokio::test]
    async fn expired_without_refresh_token_runs_flow() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authenticator::with_flow(config(&dir), FakeFlow::default());
        auth.store().save(&expired(None)).unwrap();

        auth.get_client().await.unwrap();
        assert_eq!(auth.flow_counts(), (1, 0));
    }

    #[tokio::test]
    async fn missing_scope_runs_flow() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authenticator::with_flow(config(&dir), FakeFlow::default());
        let mut credential = stored("stored-access", Utc::now(), Some("stored-refresh"));
        credential.scopes.clear();
        credential.scopes.insert("https://www.googleapis.com/auth/calendar.readonly".to_string());
        auth.store().save(&credential).unwrap();

        auth.get_client().await.unwrap();
        assert_eq!(auth.flow_counts(), (1, 0));
    }

    #[tokio::test]
    async fn failed_flow_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authenticator::with_flow(config(&dir), FakeFlow::denying());

        let err = auth.get_client().await.unwrap_err();
        assert!(matches!(err, AuthError::FlowFailed(_)));
        assert!(!auth.store().path().exists());

        auth.store().save(&expired(None)).unwrap();
        let before = std::fs::read(auth.store().path()).unwrap();
        assert!(auth.get_client().await.is_err());
        assert_eq!(std::fs::read(auth.store().path()).unwrap(), before);
    }

    #[tokio::test]
    async fn corrupt_store_runs_flow_and_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authenticator::with_flow(config(&dir), FakeFlow::default());
        std::fs::write(auth.store().path(), "{ truncated").unwrap();

        auth.get_client().await.unwrap();
        assert_eq!(auth.flow_counts(), (1, 0));
        assert_eq!(auth.store().load().unwrap().access_token, "fresh-access");
    }

    #[tokio::test]
    async fn reauthorize_ignores_valid_credential() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authenticator::with_flow(config(&dir), FakeFlow::default());
        auth.store()
            .save(&stored("stored-access", Utc::now(), Some("stored-refresh")))
            .unwrap();

        auth.reauthorize().await.unwrap();
        assert_eq!(auth.flow_counts(), (1, 0));
        assert_eq!(auth.store().load().unwrap().access_token, "fresh-access");

        auth.get_client().await.unwrap();
        assert_eq!(auth.flow_counts(), (1, 0));
    }

    #[tokio::test]
    async fn unwritable_store_still_yields_client() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let config = config(&dir).with_token_path(blocker.join("token.json"));
        let auth = Authenticator::with_flow(config, FakeFlow::default());

        assert!(auth.get_client().await.is_ok());
        assert_eq!(auth.flow_counts(), (1, 0));
    }

    #[tokio::test]
    async fn unsaved_credential_is_refreshed_from_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let config = config(&dir).with_token_path(blocker.join("token.json"));
        let flow = FakeFlow {
            short_lived: true,
            ..Default::default()
        };
        let auth = Authenticator::with_flow(config, flow);

        auth.get_client().await.unwrap();
        let handle = auth.get_client().await.unwrap();

        assert_eq!(auth.flow_counts(), (1, 1));
        assert!(handle.is_valid_at(Utc::now()));
    }

    #[tokio::test]
    async fn expired_handle_refreshes_held_credential() {
        let dir = tempfile::tempdir().unwrap();
        let flow = FakeFlow {
            short_lived: true,
            ..Default::default()
        };
        let auth = Authenticator::with_flow(config(&dir), flow);

        auth.get_client().await.unwrap();
        std::fs::remove_file(auth.store().path()).unwrap();
        auth.get_client().await.unwrap();

        assert_eq!(auth.flow_counts(), (1, 1));
        let saved = auth.store().load().unwrap();
        assert_eq!(saved.access_token, "refreshed-access");
        assert_eq!(saved.refresh_token.as_deref(), Some("fresh-refresh"));
    }

    #[test]
    fn handle_validity() {
        let now = Utc::now();
        let handle = ClientHandle {
            api: Arc::new(
                GoogleCalendarClient::new("t", "http://127.0.0.1", std::time::Duration::from_secs(1))
                    .unwrap(),
            ),
            expires_at: Some(now + Duration::minutes(5)),
        };
        assert!(handle.is_valid_at(now));
        assert!(!handle.is_valid_at(now + Duration::minutes(6)));
        assert!(ClientHandle::from_api(handle.api.clone()).is_valid_at(now + Duration::days(1)));
    }
}
