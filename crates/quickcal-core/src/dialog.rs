//! State machine for the "add event" dialog.
//!
//! ```text
//! Editing ──confirm──▶ Validating ──invalid──▶ Invalid ──edit──▶ Editing
//!                          │
//!                          └─valid─▶ Authenticating ──authenticated──▶ Submitting
//!                                         │                               │
//!                                         └──failed──▶ Failed ◀──failed───┤
//!                                                        │                │
//!                                              edit ◀────┘        succeeded▼
//!                                                                     Succeeded
//! ```
//!
//! `Succeeded` is terminal. Closing is only possible from `Editing`.

use std::fmt;

use thiserror::Error;

/// Where the dialog currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DialogState {
    #[default]
    Editing,
    Validating,
    Invalid,
    Authenticating,
    Submitting,
    Succeeded,
    Failed,
    Closed,
}

/// Inputs that move the dialog between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogEvent {
    Confirm,
    ValidationFailed,
    ValidationPassed,
    Authenticated,
    AuthenticationFailed,
    SubmitSucceeded,
    SubmitFailed,
    Edit,
    Close,
}

/// A transition that the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {event:?} while {state}")]
pub struct InvalidTransition {
    pub state: DialogState,
    pub event: DialogEvent,
}

impl DialogState {
    /// Applies `event`, returning the next state.
    pub fn next(self, event: DialogEvent) -> Result<Self, InvalidTransition> {
        use DialogEvent as E;
        use DialogState as S;

        let next = match (self, event) {
            (S::Editing, E::Confirm) => S::Validating,
            (S::Editing, E::Close) => S::Closed,
            (S::Validating, E::ValidationFailed) => S::Invalid,
            (S::Validating, E::ValidationPassed) => S::Authenticating,
            (S::Invalid, E::Edit) => S::Editing,
            (S::Authenticating, E::Authenticated) => S::Submitting,
            (S::Authenticating, E::AuthenticationFailed) => S::Failed,
            (S::Submitting, E::SubmitSucceeded) => S::Succeeded,
            (S::Submitting, E::SubmitFailed) => S::Failed,
            (S::Failed, E::Edit) => S::Editing,
            (state, event) => return Err(InvalidTransition { state, event }),
        };
        Ok(next)
    }

    /// Returns `true` once no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Closed)
    }

    /// Returns `true` while a confirm is being processed.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Self::Validating | Self::Authenticating | Self::Submitting
        )
    }
}

impl fmt::Display for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Editing => "editing",
            Self::Validating => "validating",
            Self::Invalid => "invalid",
            Self::Authenticating => "authenticating",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
