//! Drives one "add event" dialog through validation, authorization and
//! submission.

use chrono::{DateTime, Utc};
use quickcal_core::{DialogEvent, DialogState, DraftInputs, build, validate};
use tracing::debug;

use crate::authenticator::Authenticator;
use crate::client::InsertedEvent;
use crate::error::AddEventError;
use crate::oauth::{OAuthClient, OAuthFlow};
use crate::sync::SyncClient;

/// A dialog session bound to a shared [`Authenticator`].
///
/// Validation and submission errors leave the dialog open so the user can
/// edit and confirm again. Once an event is added, the dialog is done.
#[derive(Debug)]
pub struct AddEventDialog<'a, F = OAuthClient> {
    authenticator: &'a Authenticator<F>,
    sync: SyncClient,
    state: DialogState,
}

impl<'a, F: OAuthFlow> AddEventDialog<'a, F> {
    /// Opens a dialog that submits to the authenticator's calendar.
    pub fn new(authenticator: &'a Authenticator<F>) -> Self {
        let sync = SyncClient::new(authenticator.config().calendar_id.clone());
        Self::with_sync(authenticator, sync)
    }

    pub fn with_sync(authenticator: &'a Authenticator<F>, sync: SyncClient) -> Self {
        Self {
            authenticator,
            sync,
            state: DialogState::Editing,
        }
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub async fn confirm(&mut self, inputs: &DraftInputs) -> Result<InsertedEvent, AddEventError> {
        self.confirm_at(inputs, Utc::now()).await
    }

    /// Runs one confirm pass, validating against `now`.
    pub async fn confirm_at(
        &mut self,
        inputs: &DraftInputs,
        now: DateTime<Utc>,
    ) -> Result<InsertedEvent, AddEventError> {
        if matches!(self.state, DialogState::Invalid | DialogState::Failed) {
            self.advance(DialogEvent::Edit)?;
        }
        self.advance(DialogEvent::Confirm)?;

        let draft = match validate(inputs, now) {
            Ok(draft) => draft,
            Err(e) => {
                self.advance(DialogEvent::ValidationFailed)?;
                return Err(e.into());
            }
        };
        self.advance(DialogEvent::ValidationPassed)?;

        let handle = match self.authenticator.get_client().await {
            Ok(handle) => handle,
            Err(e) => {
                self.advance(DialogEvent::AuthenticationFailed)?;
                return Err(e.into());
            }
        };
        self.advance(DialogEvent::Authenticated)?;

        match self.sync.submit(Some(&handle), &build(&draft)).await {
            Ok(inserted) => {
                self.advance(DialogEvent::SubmitSucceeded)?;
                Ok(inserted)
            }
            Err(e) => {
                self.advance(DialogEvent::SubmitFailed)?;
                Err(e.into())
            }
        }
    }

    /// Discards the draft. The authenticator's cached state is untouched.
    pub fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if matches!(self.state, DialogState::Invalid | DialogState::Failed) {
            self.state = DialogState::Editing;
        }
        self.state = self.state.next(DialogEvent::Close).unwrap_or(DialogState::Closed);
        debug!("dialog closed");
    }

    fn advance(&mut self, event: DialogEvent) -> Result<(), AddEventError> {
        self.state = self
            .state
            .next(event)
            .map_err(|e| AddEventError::Dialog(e.state))?;
        debug!("dialog is {}", self.state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuthError, SubmissionError};
    use crate::test_support::{FakeFlow, config, serve_once};
    use chrono::{Duration, TimeZone};
    use quickcal_core::{Frequency, ValidationError};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn standup() -> DraftInputs {
        DraftInputs::new(
            "Standup",
            Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap(),
            Duration::minutes(15),
        )
        .with_repeat(
            Frequency::WeeklyWeekday,
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn invalid_input_never_authenticates() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authenticator::with_flow(config(&dir), FakeFlow::default());
        let mut dialog = AddEventDialog::new(&auth);

        let mut inputs = standup();
        inputs.title = "   ".to_string();
        let err = dialog.confirm_at(&inputs, now()).await.unwrap_err();

        assert_eq!(err, AddEventError::Validation(ValidationError::EmptyTitle));
        assert_eq!(dialog.state(), DialogState::Invalid);
        assert_eq!(auth.flow_counts(), (0, 0));
        assert!(!auth.store().path().exists());
    }

    #[tokio::test]
    async fn auth_failure_keeps_dialog_open() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authenticator::with_flow(config(&dir), FakeFlow::denying());
        let mut dialog = AddEventDialog::new(&auth);

        let err = dialog.confirm_at(&standup(), now()).await.unwrap_err();
        assert!(matches!(err, AddEventError::Auth(AuthError::FlowFailed(_))));
        assert_eq!(dialog.state(), DialogState::Failed);

        let err = dialog.confirm_at(&standup(), now()).await.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(auth.flow_counts(), (2, 0));

        dialog.close();
        assert_eq!(dialog.state(), DialogState::Closed);
    }

    #[tokio::test]
    async fn successful_submit_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let (base, server) = serve_once("200 OK", r#"{"id": "evt42"}"#);
        let mut config = config(&dir);
        config.endpoints.api_base = base;
        let auth = Authenticator::with_flow(config, FakeFlow::default());
        let mut dialog = AddEventDialog::new(&auth);

        let inserted = dialog.confirm_at(&standup(), now()).await.unwrap();
        assert_eq!(inserted.id.as_deref(), Some("evt42"));
        assert_eq!(dialog.state(), DialogState::Succeeded);

        let request = server.join().unwrap();
        assert!(request.contains("RRULE:FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;UNTIL=20250301T000000Z"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer fresh-access"));

        let err = dialog.confirm_at(&standup(), now()).await.unwrap_err();
        assert_eq!(err, AddEventError::Dialog(DialogState::Succeeded));
        assert_eq!(auth.flow_counts(), (1, 0));

        dialog.close();
        assert_eq!(dialog.state(), DialogState::Succeeded);
    }

    #[tokio::test]
    async fn rejected_submit_can_be_retried_by_user() {
        let dir = tempfile::tempdir().unwrap();
        let (base, server) = serve_once(
            "400 Bad Request",
            r#"{"error": {"code": 400, "message": "Invalid recurrence rule."}}"#,
        );
        let mut config = config(&dir);
        config.endpoints.api_base = base;
        let auth = Authenticator::with_flow(config, FakeFlow::default());
        let mut dialog = AddEventDialog::new(&auth);

        let err = dialog.confirm_at(&standup(), now()).await.unwrap_err();
        server.join().unwrap();
        assert_eq!(
            err,
            AddEventError::Submission(SubmissionError::RemoteRejected(
                "Invalid recurrence rule.".to_string()
            ))
        );
        assert_eq!(dialog.state(), DialogState::Failed);

        let mut past = standup();
        past.start = now() - Duration::hours(1);
        let err = dialog.confirm_at(&past, now()).await.unwrap_err();
        assert_eq!(err, AddEventError::Validation(ValidationError::PastStart));
        assert_eq!(dialog.state(), DialogState::Invalid);
    }

    #[tokio::test]
    async fn closing_keeps_cached_client() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authenticator::with_flow(config(&dir), FakeFlow::default());
        auth.get_client().await.unwrap();

        let mut dialog = AddEventDialog::new(&auth);
        dialog.close();
        assert_eq!(dialog.state(), DialogState::Closed);

        auth.get_client().await.unwrap();
        assert_eq!(auth.flow_counts(), (1, 0));
    }
}
