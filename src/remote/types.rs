//! Snapshot types delivered by the backend.

use std::fmt;

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::session::{SessionId, SessionSnapshot};

/// Backend-assigned identifier of an evaluator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluatorId(pub u64);

impl fmt::Display for EvaluatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "eval-{}", self.0)
    }
}

/// Evaluation capability of the current suspend context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatorDescriptor {
    pub id: EvaluatorId,
    #[serde(default)]
    pub can_evaluate_in_document: bool,
}

/// Current execution position as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePositionDescriptor {
    /// File URL, e.g. `file:///src/main.rs`.
    pub file_url: String,
    /// Zero-based line.
    pub line: u32,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// How the UI container for a session should be built.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionTabInfo {
    pub icon: Option<String>,
    pub execution_environment: Option<String>,
    pub content_to_reuse: Option<String>,
    pub force_new_debugger_ui: bool,
    pub with_frames_customization: bool,
    pub should_show_tab: bool,
}

/// Payload of a tab descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TabInfo {
    /// Build a debugger tab.
    Session(SessionTabInfo),
    /// The session is shown elsewhere; no tab will be built.
    NoTab,
}

/// Emitted when the backend enters a paused state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PausedEvent {
    pub paused_by_user: bool,
    pub top_frame_absent: bool,
}

/// Stream of pause notifications attached to a tab descriptor.
pub type PausedEventStream = BoxStream<'static, Option<PausedEvent>>;

/// One-shot tab descriptor with its pause stream.
pub struct TabDescriptor {
    pub info: TabInfo,
    pub paused: PausedEventStream,
}

impl fmt::Debug for TabDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabDescriptor")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Editors provider information sent with a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorsProviderDto {
    pub file_type_id: String,
    /// Set when the provider can be resolved inside the frontend process.
    #[serde(default)]
    pub local: bool,
}

/// Initial description of a session handed to the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub id: SessionId,
    #[serde(default)]
    pub name: String,
    pub editors_provider: EditorsProviderDto,
    #[serde(default = "SessionSnapshot::running")]
    pub initial_state: SessionSnapshot,
}

impl SessionDto {
    /// A running session with a remote editors provider.
    pub fn new(id: SessionId, name: impl Into<String>, file_type_id: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            editors_provider: EditorsProviderDto {
                file_type_id: file_type_id.into(),
                local: false,
            },
            initial_state: SessionSnapshot::running(),
        }
    }

    pub fn with_initial_state(mut self, state: SessionSnapshot) -> Self {
        self.initial_state = state;
        self
    }

    pub fn with_local_editors(mut self) -> Self {
        self.editors_provider.local = true;
        self
    }
}

/// Result of a remote evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub value: String,
    #[serde(default)]
    pub type_name: Option<String>,
}
