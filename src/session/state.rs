//! Session flags snapshot and the tab lifecycle state machine.

use serde::{Deserialize, Serialize};

/// Coarse debugger flags reported by the backend.
///
/// Always replaced wholesale, so every predicate read from one instance is
/// mutually consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub stopped: bool,
    pub paused: bool,
    pub read_only: bool,
    pub pause_action_supported: bool,
    pub suspended: bool,
}

impl SessionSnapshot {
    /// Flags of a freshly started, running session.
    pub fn running() -> Self {
        Self {
            pause_action_supported: true,
            ..Self::default()
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_pause_action_supported(&self) -> bool {
        self.pause_action_supported
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }
}

/// Lifecycle of the session tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TabState {
    /// Listening for a tab descriptor.
    #[default]
    WaitingForDescriptor,
    /// Building the tab on the UI context.
    Constructing,
    /// Tab built and receiving pause events.
    Attached,
    /// Backend offered no tab for this session.
    Skipped,
}

impl TabState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - WaitingForDescriptor -> Constructing
    /// - WaitingForDescriptor -> Skipped
    /// - Constructing -> Attached
    /// - Constructing -> WaitingForDescriptor (construction failed)
    pub fn can_transition_to(&self, target: TabState) -> bool {
        use TabState::*;
        matches!(
            (*self, target),
            (WaitingForDescriptor, Constructing)
                | (WaitingForDescriptor, Skipped)
                | (Constructing, Attached)
                | (Constructing, WaitingForDescriptor)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: TabState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::MirrorError::InvalidTabTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TabState::Attached | TabState::Skipped)
    }
}
