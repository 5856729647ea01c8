//! Google Calendar API client for inserting events.

use std::time::Duration;

use quickcal_core::EventPayload;
use serde::Deserialize;
use tracing::{debug, info};

use crate::BoxFuture;
use crate::error::SubmissionError;

/// The part of the Calendar API this crate uses.
pub trait CalendarApi: Send + Sync {
    /// Inserts one event into `calendar_id`.
    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        payload: &'a EventPayload,
    ) -> BoxFuture<'a, Result<InsertedEvent, SubmissionError>>;
}

/// Identity of an event the API accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub html_link: Option<String>,
}

/// HTTP client authorized with a bearer token.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    api_base: String,
}

impl GoogleCalendarClient {
    pub fn new(
        access_token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            access_token: access_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        )
    }

    async fn post_event(
        &self,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> Result<InsertedEvent, SubmissionError> {
        let url = self.events_url(calendar_id);
        debug!("inserting event {:?} via {}", payload.summary, url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmissionError::Transport("request timeout".to_string())
                } else if e.is_connect() {
                    SubmissionError::Transport(format!("connection failed: {}", e))
                } else {
                    SubmissionError::Transport(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SubmissionError::Transport(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(SubmissionError::RemoteRejected(api_error_message(
                status, &body,
            )));
        }

        // The event was created even if the echo cannot be decoded.
        let inserted: InsertedEvent = serde_json::from_str(&body).unwrap_or_default();
        info!(
            "event inserted into {} (id: {})",
            calendar_id,
            inserted.id.as_deref().unwrap_or("unknown")
        );
        Ok(inserted)
    }
}

impl CalendarApi for GoogleCalendarClient {
    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        payload: &'a EventPayload,
    ) -> BoxFuture<'a, Result<InsertedEvent, SubmissionError>> {
        Box::pin(self.post_event(calendar_id, payload))
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Extracts Google's `error.message`, falling back to status and raw body.
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => format!("{}: {}", status, body.trim()),
    }
}
