//! Core types: event drafts, recurrence rules, payloads, dialog state

pub mod dialog;
pub mod draft;
pub mod payload;
pub mod recurrence;
pub mod time;
pub mod tracing;

pub use dialog::{DialogEvent, DialogState, InvalidTransition};
pub use draft::{DraftInputs, EventDraft, ValidationError, validate, validate_now};
pub use payload::{EventDateTime, EventPayload, build};
pub use recurrence::{Frequency, RecurrenceSpec, format_until};
pub use time::{TimeParseError, parse_duration, parse_when};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
