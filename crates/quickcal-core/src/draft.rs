//! Event drafts and their validation.
//!
//! [`DraftInputs`] carries the raw values collected from the form.
//! [`validate`] turns them into an [`EventDraft`], or reports the first
//! problem found.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recurrence::{Frequency, RecurrenceSpec};

/// Shortest duration an event may have.
pub const MIN_DURATION: Duration = Duration::minutes(1);

/// Why a draft was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ValidationError {
    /// The title is empty or whitespace only.
    #[error("No name provided")]
    EmptyTitle,
    /// The start lies before the validation instant.
    #[error("Cannot add event in the past")]
    PastStart,
    /// The duration is shorter than one minute.
    #[error("Duration too short")]
    DurationTooShort,
    /// The event would end past the last representable instant.
    #[error("Duration too long")]
    DurationTooLong,
}

/// Raw field values as entered in the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftInputs {
    pub title: String,
    pub start: DateTime<Utc>,
    pub duration: Duration,
    pub frequency: Frequency,
    /// End of the repeat window. Falls back to `start` when unset.
    pub until: Option<DateTime<Utc>>,
}

impl DraftInputs {
    /// Creates inputs for a one-off event.
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            title: title.into(),
            start,
            duration,
            frequency: Frequency::None,
            until: None,
        }
    }

    /// Sets the repeat policy.
    pub fn with_repeat(mut self, frequency: Frequency, until: DateTime<Utc>) -> Self {
        self.frequency = frequency;
        self.until = Some(until);
        self
    }

    /// Sets the repeat policy from a selector index.
    pub fn with_repeat_index(self, index: usize, until: DateTime<Utc>) -> Self {
        self.with_repeat(Frequency::from_index(index), until)
    }
}

/// A validated event, ready to be turned into a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub start: DateTime<Utc>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub recurrence: Option<RecurrenceSpec>,
}

impl EventDraft {
    /// Returns the end instant, saturating at [`DateTime::<Utc>::MAX_UTC`].
    pub fn end(&self) -> DateTime<Utc> {
        self.start
            .checked_add_signed(self.duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Validates form inputs against `now`.
///
/// Checks run in a fixed order and the first failure wins: title, then
/// start, then duration.
pub fn validate(inputs: &DraftInputs, now: DateTime<Utc>) -> Result<EventDraft, ValidationError> {
    if inputs.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if inputs.start < now {
        return Err(ValidationError::PastStart);
    }
    if inputs.duration < MIN_DURATION {
        return Err(ValidationError::DurationTooShort);
    }
    if inputs.start.checked_add_signed(inputs.duration).is_none() {
        return Err(ValidationError::DurationTooLong);
    }

    let recurrence = inputs
        .frequency
        .repeats()
        .then(|| RecurrenceSpec::new(inputs.frequency, inputs.until.unwrap_or(inputs.start)));

    Ok(EventDraft {
        title: inputs.title.clone(),
        start: inputs.start,
        duration: inputs.duration,
        recurrence,
    })
}

/// Validates form inputs against the current wall clock.
pub fn validate_now(inputs: &DraftInputs) -> Result<EventDraft, ValidationError> {
    validate(inputs, Utc::now())
}

mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Ok(Duration::seconds(secs))
    }
}
