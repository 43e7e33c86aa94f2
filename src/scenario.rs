//! Scenario replay against the in-memory backend.
//!
//! A scenario is a JSON document describing one session and a list of steps.
//! Each step feeds the backend (or queries the facade), waits for the mirror
//! to settle and records what the facade reports.
//!
//! ```json
//! {
//!   "session": { "id": 1, "name": "run", "editorsProvider": { "fileTypeId": "Rust" } },
//!   "steps": [
//!     { "delayMs": 10, "event": { "type": "tab", "info": { "kind": "session", "shouldShowTab": true } } },
//!     { "event": { "type": "state", "paused": true, "suspended": true } },
//!     { "event": { "type": "pause", "pausedByUser": true } }
//!   ]
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::MirrorError;
use crate::remote::{
    EvaluatorDescriptor, EvaluatorId, InMemoryBackend, PausedEvent, PausedFeed, SessionDto,
    SessionTabInfo, SourcePositionDescriptor, TabInfo,
};
use crate::session::{FrontendSession, SessionProxy, SessionSnapshot, TabState};
use crate::ui::{flush, DebugTab, TabFactory, UiDispatcher};
use crate::Result;

/// How long the player waits after each step by default.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(25);

fn default_project() -> String {
    "scenario".to_string()
}

/// A replayable session script.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default = "default_project")]
    pub project: String,
    pub session: SessionDto,
    #[serde(default)]
    pub settle_ms: Option<u64>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Settle delay requested by the scenario, or the default.
    pub fn settle(&self) -> Duration {
        self.settle_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SETTLE)
    }
}

/// One scenario step.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Wait this long before applying the event.
    #[serde(default)]
    pub delay_ms: u64,
    pub event: ScenarioEvent,
}

/// What a step does.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScenarioEvent {
    /// Publish a new flags snapshot.
    State(SessionSnapshot),
    /// Publish the evaluator descriptor (`null` while running).
    Evaluator {
        #[serde(default)]
        evaluator: Option<EvaluatorDescriptor>,
    },
    /// Publish the source position descriptor.
    SourcePosition {
        #[serde(default)]
        position: Option<SourcePositionDescriptor>,
    },
    /// Offer a tab descriptor (`null` for "not yet").
    Tab {
        #[serde(default)]
        info: Option<TabInfo>,
    },
    /// Report a pause on the most recently offered tab.
    #[serde(rename_all = "camelCase")]
    Pause {
        #[serde(default)]
        paused_by_user: bool,
        #[serde(default)]
        top_frame_absent: bool,
    },
    /// Make the backend refuse to attach an evaluator.
    RefuseEvaluator { id: EvaluatorId },
    /// Define what an expression evaluates to.
    Define { expression: String, value: String },
    /// Evaluate through the current evaluator.
    Evaluate { expression: String },
    /// End every backend stream of the session.
    EndStreams,
    /// Shut the session mirror down.
    Close,
}

impl ScenarioEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::State(_) => "state",
            Self::Evaluator { .. } => "evaluator",
            Self::SourcePosition { .. } => "sourcePosition",
            Self::Tab { .. } => "tab",
            Self::Pause { .. } => "pause",
            Self::RefuseEvaluator { .. } => "refuseEvaluator",
            Self::Define { .. } => "define",
            Self::Evaluate { .. } => "evaluate",
            Self::EndStreams => "endStreams",
            Self::Close => "close",
        }
    }
}

/// Facade state observed after a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub step: usize,
    pub event: &'static str,
    pub closed: bool,
    pub flags: SessionSnapshot,
    pub evaluator: Option<EvaluatorId>,
    pub source_position: Option<String>,
    pub tab_state: TabState,
    pub has_tab: bool,
    pub last_pause: Option<PausedEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<String>,
}

/// Drives a scenario through the backend and snapshots the facade.
pub struct ScenarioPlayer<'a> {
    backend: &'a InMemoryBackend,
    session: &'a FrontendSession,
    ui: &'a dyn UiDispatcher,
    settle: Duration,
    pauses: Option<PausedFeed>,
}

impl<'a> ScenarioPlayer<'a> {
    pub fn new(
        backend: &'a InMemoryBackend,
        session: &'a FrontendSession,
        ui: &'a dyn UiDispatcher,
    ) -> Self {
        Self {
            backend,
            session,
            ui,
            settle: DEFAULT_SETTLE,
            pauses: None,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Apply every step in order and collect one report per step.
    pub async fn play(&mut self, steps: &[Step]) -> Result<Vec<StepReport>> {
        let mut reports = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            if step.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
            }
            debug!(session = %self.session.id(), step = index, event = step.event.kind(), "apply step");
            let evaluation = self.apply(&step.event).await?;
            self.settle().await;
            reports.push(self.report(index, &step.event, evaluation));
        }
        info!(session = %self.session.id(), steps = reports.len(), "scenario finished");
        Ok(reports)
    }

    async fn apply(&mut self, event: &ScenarioEvent) -> Result<Option<String>> {
        let id = self.session.id();
        match event {
            ScenarioEvent::State(state) => self.backend.publish_state(id, *state)?,
            ScenarioEvent::Evaluator { evaluator } => {
                self.backend.publish_evaluator(id, evaluator.clone())?
            }
            ScenarioEvent::SourcePosition { position } => {
                self.backend.publish_source_position(id, position.clone())?
            }
            ScenarioEvent::Tab { info } => {
                let feed = self.backend.offer_tab(id, info.clone())?;
                if info.is_some() {
                    self.pauses = Some(feed);
                }
            }
            ScenarioEvent::Pause {
                paused_by_user,
                top_frame_absent,
            } => match &self.pauses {
                Some(feed) => feed.pause(*paused_by_user, *top_frame_absent),
                None => debug!(session = %id, "pause before any tab offer, ignored"),
            },
            ScenarioEvent::RefuseEvaluator { id: evaluator } => {
                self.backend.refuse_evaluator(*evaluator)?
            }
            ScenarioEvent::Define { expression, value } => {
                self.backend.define_value(expression.clone(), value.clone())?
            }
            ScenarioEvent::Evaluate { expression } => {
                return Ok(Some(self.evaluate(expression).await));
            }
            ScenarioEvent::EndStreams => self.backend.end_streams(id)?,
            ScenarioEvent::Close => self.session.shutdown().await?,
        }
        Ok(None)
    }

    async fn evaluate(&self, expression: &str) -> String {
        let evaluator = match self.session.try_current_evaluator() {
            Ok(Some(evaluator)) => evaluator,
            Ok(None) => return "error: no evaluator".to_string(),
            Err(err) => return format!("error: {}", err),
        };
        match evaluator.evaluate(expression).await {
            Ok(result) => result.value,
            Err(err) => format!("error: {}", err),
        }
    }

    async fn settle(&self) {
        tokio::time::sleep(self.settle).await;
        match flush(self.ui).await {
            Ok(()) | Err(MirrorError::UiUnavailable) => {}
            Err(err) => debug!(error = %err, "UI flush failed"),
        }
    }

    fn report(&self, step: usize, event: &ScenarioEvent, evaluation: Option<String>) -> StepReport {
        StepReport {
            step,
            event: event.kind(),
            closed: self.session.is_closed(),
            flags: self.session.current_flags(),
            evaluator: self.session.current_evaluator().map(|e| e.id()),
            source_position: self
                .session
                .current_source_position()
                .map(|p| p.to_string()),
            tab_state: self.session.tab_state(),
            has_tab: self.session.has_tab(),
            last_pause: self.session.last_pause(),
            evaluation,
        }
    }
}

/// Tab that only logs what happens to it.
pub struct LoggingTab {
    session: String,
}

impl DebugTab for LoggingTab {
    fn show(&mut self) {
        info!(session = %self.session, "tab shown");
    }

    fn on_pause(&mut self, paused_by_user: bool, top_frame_absent: bool) {
        info!(session = %self.session, paused_by_user, top_frame_absent, "tab paused");
    }
}

/// Factory producing [`LoggingTab`]s.
#[derive(Debug, Default)]
pub struct LoggingTabs;

impl TabFactory for LoggingTabs {
    fn create_tab(&self, session: &SessionProxy, info: &SessionTabInfo) -> Result<Box<dyn DebugTab>> {
        info!(session = %session.id(), icon = ?info.icon, "building tab");
        Ok(Box::new(LoggingTab {
            session: session.id().to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;
    use crate::session::{Project, SessionOptions, SessionServices};
    use crate::ui::UiThread;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    const SCENARIO: &str = r#"{
        "session": { "id": 9, "name": "demo", "editorsProvider": { "fileTypeId": "Rust" } },
        "settleMs": 20,
        "steps": [
            { "event": { "type": "tab", "info": null } },
            { "event": { "type": "tab", "info": { "kind": "session", "shouldShowTab": true } } },
            { "event": { "type": "state", "paused": true, "suspended": true, "pauseActionSupported": true } },
            { "event": { "type": "evaluator", "evaluator": { "id": 1, "canEvaluateInDocument": true } } },
            { "event": { "type": "sourcePosition", "position": { "fileUrl": "file:///src/main.rs", "line": 4 } } },
            { "event": { "type": "define", "expression": "answer", "value": "42" } },
            { "event": { "type": "evaluate", "expression": "answer" } },
            { "event": { "type": "pause", "pausedByUser": true } },
            { "event": { "type": "close" } }
        ]
    }"#;

    #[test]
    fn test_parse_scenario() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        assert_eq!(scenario.project, "scenario");
        assert_eq!(scenario.settle(), Duration::from_millis(20));
        assert_eq!(scenario.steps.len(), 9);
        assert!(matches!(
            scenario.steps[2].event,
            ScenarioEvent::State(SessionSnapshot { paused: true, .. })
        ));
        assert!(matches!(
            scenario.steps[7].event,
            ScenarioEvent::Pause {
                paused_by_user: true,
                top_frame_absent: false
            }
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();
        let scenario = Scenario::from_file(file.path()).unwrap();
        assert_eq!(scenario.session.name, "demo");

        let missing = Scenario::from_file(Path::new("/nonexistent/scenario.json"));
        assert!(matches!(missing, Err(MirrorError::Io(_))));
    }

    #[test]
    fn test_unknown_event_rejected() {
        let result: std::result::Result<Step, _> =
            serde_json::from_str(r#"{ "event": { "type": "explode" } }"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_play_scenario() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        let backend = Arc::new(InMemoryBackend::new());
        let ui = Arc::new(UiThread::spawn("scenario-ui").unwrap());
        let services = SessionServices {
            remote: backend.clone(),
            evaluation: backend.clone(),
            tabs: Arc::new(LoggingTabs),
            ui: ui.clone(),
        };
        let session = FrontendSession::open(
            Project::new(scenario.project.clone()),
            &Scope::root("test"),
            scenario.session.clone(),
            services,
            SessionOptions::default(),
        );

        let reports = ScenarioPlayer::new(&backend, &session, ui.as_ref())
            .with_settle(scenario.settle())
            .play(&scenario.steps)
            .await
            .unwrap();

        assert_eq!(reports[0].tab_state, TabState::WaitingForDescriptor);
        assert!(reports[1].has_tab);
        assert_eq!(reports[1].tab_state, TabState::Attached);
        assert!(reports[2].flags.paused && reports[2].flags.suspended);
        assert_eq!(reports[3].evaluator, Some(EvaluatorId(1)));
        assert_eq!(reports[4].source_position.as_deref(), Some("/src/main.rs:5"));
        assert_eq!(reports[6].evaluation.as_deref(), Some("42"));
        assert_eq!(
            reports[7].last_pause,
            Some(PausedEvent {
                paused_by_user: true,
                top_frame_absent: false
            })
        );

        let closed = &reports[8];
        assert!(closed.closed);
        assert!(closed.evaluator.is_none());
        assert!(closed.flags.paused);
        assert_eq!(backend.open_subscriptions(session.id()), 0);
    }
}
