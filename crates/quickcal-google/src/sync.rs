//! Submits built payloads through an authorized handle.

use quickcal_core::EventPayload;
use tracing::{info, warn};

use crate::authenticator::ClientHandle;
use crate::client::InsertedEvent;
use crate::error::SubmissionError;

pub type SubmissionResult = Result<InsertedEvent, SubmissionError>;

/// Sends events to one calendar. Each submit makes at most one insert call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncClient {
    calendar_id: String,
}

impl SyncClient {
    pub fn new(calendar_id: impl Into<String>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
        }
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    pub async fn submit(&self, handle: Option<&ClientHandle>, payload: &EventPayload) -> SubmissionResult {
        let Some(handle) = handle else {
            warn!("submit called without an authorized client");
            return Err(SubmissionError::ServiceUnavailable);
        };

        match handle.api().insert_event(&self.calendar_id, payload).await {
            Ok(inserted) => {
                info!("event {:?} added", payload.summary);
                Ok(inserted)
            }
            Err(e) => {
                warn!("event {:?} not added: {}", payload.summary, e);
                Err(e)
            }
        }
    }
}

impl Default for SyncClient {
    fn default() -> Self {
        Self::new("primary")
    }
}
