//! Config Entry State Machine
//!
//! Enforces valid state transitions for the ConfigEntry lifecycle:
//!
//! ```text
//! NotLoaded → SetupInProgress → Loaded
//!                            ↘ SetupError → SetupInProgress (retry)
//!
//! Loaded/SetupError → UnloadInProgress → NotLoaded
//!                                      ↘ FailedUnload (terminal)
//! ```

use crate::entry::ConfigEntryState;
use thiserror::Error;

/// Error when an invalid state transition is attempted
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid state transition from {from:?} to {to:?}: {reason}")]
pub struct InvalidTransition {
    pub from: ConfigEntryState,
    pub to: ConfigEntryState,
    pub reason: &'static str,
}

impl ConfigEntryState {
    /// Attempt a transition to a new state.
    pub fn try_transition(
        self,
        to: ConfigEntryState,
    ) -> Result<ConfigEntryState, InvalidTransition> {
        use ConfigEntryState::*;

        let valid = matches!(
            (self, to),
            (NotLoaded, SetupInProgress)
                | (SetupInProgress, Loaded)
                | (SetupInProgress, SetupError)
                | (SetupError, SetupInProgress)
                | (SetupError, UnloadInProgress)
                | (Loaded, UnloadInProgress)
                | (UnloadInProgress, NotLoaded)
                | (UnloadInProgress, FailedUnload)
        );

        if valid {
            Ok(to)
        } else {
            Err(InvalidTransition {
                from: self,
                to,
                reason: Self::transition_error_reason(self, to),
            })
        }
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition_to(self, to: ConfigEntryState) -> bool {
        self.try_transition(to).is_ok()
    }

    fn transition_error_reason(from: ConfigEntryState, to: ConfigEntryState) -> &'static str {
        use ConfigEntryState::*;

        match (from, to) {
            (FailedUnload, _) => "FailedUnload is terminal - entry cannot recover",
            (SetupInProgress, NotLoaded) => {
                "Setup in progress - must complete before returning to NotLoaded"
            }
            (UnloadInProgress, Loaded) => "Unload in progress - cannot go back to Loaded",
            (NotLoaded, Loaded) => "Cannot jump to Loaded - must go through SetupInProgress",
            (Loaded, NotLoaded) => "Cannot jump to NotLoaded - must go through UnloadInProgress",
            (Loaded, SetupInProgress) => "Already loaded - unload first before re-setup",
            _ => "Invalid state transition",
        }
    }
}
