//! The session object handed to UI and action code.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::BoxStream;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::editors::EditorsProvider;
use super::evaluator::FrontendEvaluator;
use super::mirror::SessionStateMirror;
use super::position::SourcePosition;
use super::tab::TabController;
use super::{SessionId, SessionSnapshot, TabState};
use crate::error::MirrorError;
use crate::projector::{Projection, Projector};
use crate::remote::{EvaluationBackend, PausedEvent, RemoteSessionSource, SessionDto};
use crate::scope::Scope;
use crate::ui::{run_on_ui, DebugTab, TabFactory, TabSlot, UiDispatcher};
use crate::Result;

/// Default time [`FrontendSession::shutdown`] waits for session tasks.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The project (workspace) a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    name: String,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// External collaborators a session talks to.
#[derive(Clone)]
pub struct SessionServices {
    pub remote: Arc<dyn RemoteSessionSource>,
    pub evaluation: Arc<dyn EvaluationBackend>,
    pub tabs: Arc<dyn TabFactory>,
    pub ui: Arc<dyn UiDispatcher>,
}

/// Per-session tunables.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub join_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }
}

/// Cheap handle given to the tab factory and the tab itself.
///
/// Reads go straight to the state mirror; the hooks are only invoked on the
/// UI context.
#[derive(Clone)]
pub struct SessionProxy {
    inner: Arc<ProxyInner>,
}

struct ProxyInner {
    id: SessionId,
    name: String,
    scope: Scope,
    mirror: SessionStateMirror,
    tab: TabSlot,
    pauses: watch::Sender<Option<PausedEvent>>,
}

impl SessionProxy {
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn mirror(&self) -> &SessionStateMirror {
        &self.inner.mirror
    }

    /// Current evaluator; `None` while running and once the session is closed.
    pub fn current_evaluator(&self) -> Option<Arc<FrontendEvaluator>> {
        if self.is_closed() {
            return None;
        }
        self.inner.mirror.current_evaluator()
    }

    /// Current source position; `None` when unknown and once closed.
    pub fn current_source_position(&self) -> Option<Arc<SourcePosition>> {
        if self.is_closed() {
            return None;
        }
        self.inner.mirror.current_source_position()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.scope.is_cancelled()
    }

    pub fn flags(&self) -> SessionSnapshot {
        self.inner.mirror.current_flags()
    }

    pub fn has_tab(&self) -> bool {
        self.inner.tab.is_installed()
    }

    /// Register the freshly built tab. Returns `false` if one is registered.
    pub(crate) fn on_tab_initialized(&self, tab: Box<dyn DebugTab>) -> bool {
        self.inner.tab.install(tab)
    }

    pub(crate) fn show_tab(&self) {
        self.inner.tab.with_tab(|tab| tab.show());
    }

    /// Record a pause and hand it to the tab. Returns whether a tab got it.
    pub(crate) fn on_pause(&self, paused_by_user: bool, top_frame_absent: bool) -> bool {
        self.inner.pauses.send_replace(Some(PausedEvent {
            paused_by_user,
            top_frame_absent,
        }));
        self.inner
            .tab
            .with_tab(|tab| tab.on_pause(paused_by_user, top_frame_absent))
            .is_some()
    }
}

impl fmt::Debug for SessionProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionProxy")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

/// Frontend view of one backend debug session.
///
/// Owns a scope that parents every subscription and materialized object of
/// the session. Reads never block; they return whatever was published last.
pub struct FrontendSession {
    project: Project,
    scope: Scope,
    proxy: SessionProxy,
    editors: EditorsProvider,
    tab_state: watch::Receiver<TabState>,
    ui: Arc<dyn UiDispatcher>,
    options: SessionOptions,
    closed: AtomicBool,
}

impl FrontendSession {
    /// Start mirroring the session described by `dto`.
    ///
    /// Must be called inside a tokio runtime. The three state projectors and
    /// the tab controller start immediately.
    pub fn open(
        project: Project,
        parent: &Scope,
        dto: SessionDto,
        services: SessionServices,
        options: SessionOptions,
    ) -> Self {
        let id = dto.id;
        let scope = parent.child(format!("session {}", id));
        let mirror = SessionStateMirror::start(
            &scope,
            id,
            dto.initial_state,
            services.remote.as_ref(),
            services.evaluation.clone(),
        );
        let (pauses, _) = watch::channel(None);
        let proxy = SessionProxy {
            inner: Arc::new(ProxyInner {
                id,
                name: dto.name.clone(),
                scope: scope.clone(),
                mirror,
                tab: TabSlot::new(),
                pauses,
            }),
        };

        let (controller, tab_state) = TabController::new(
            proxy.clone(),
            scope.clone(),
            services.ui.clone(),
            services.tabs.clone(),
        );
        controller.start(services.remote.tab_info_updates(id));

        info!(session = %id, name = %dto.name, project = project.name(), "session mirror opened");

        Self {
            project,
            scope,
            editors: EditorsProvider::resolve(id, &dto.editors_provider),
            proxy,
            tab_state,
            ui: services.ui,
            options,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.proxy.id()
    }

    pub fn name(&self) -> &str {
        self.proxy.name()
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn editors_provider(&self) -> &EditorsProvider {
        &self.editors
    }

    /// Scope owning every subscription of this session.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn proxy(&self) -> &SessionProxy {
        &self.proxy
    }

    pub fn is_closed(&self) -> bool {
        self.scope.is_cancelled()
    }

    /// Current evaluator; `None` while running and after close.
    pub fn current_evaluator(&self) -> Option<Arc<FrontendEvaluator>> {
        self.try_current_evaluator().ok().flatten()
    }

    /// Like [`current_evaluator`](Self::current_evaluator) but reports a
    /// closed session as an error.
    pub fn try_current_evaluator(&self) -> Result<Option<Arc<FrontendEvaluator>>> {
        self.ensure_open()?;
        Ok(self.proxy.mirror().current_evaluator())
    }

    /// Current source position; `None` when unknown and after close.
    pub fn current_source_position(&self) -> Option<Arc<SourcePosition>> {
        self.try_current_source_position().ok().flatten()
    }

    pub fn try_current_source_position(&self) -> Result<Option<Arc<SourcePosition>>> {
        self.ensure_open()?;
        Ok(self.proxy.mirror().current_source_position())
    }

    /// Latest flags snapshot. After close this is the last one received.
    pub fn current_flags(&self) -> SessionSnapshot {
        self.proxy.flags()
    }

    pub fn is_stopped(&self) -> bool {
        self.proxy.mirror().is_stopped()
    }

    pub fn is_paused(&self) -> bool {
        self.proxy.mirror().is_paused()
    }

    pub fn is_read_only(&self) -> bool {
        self.proxy.mirror().is_read_only()
    }

    pub fn is_pause_action_supported(&self) -> bool {
        self.proxy.mirror().is_pause_action_supported()
    }

    pub fn is_suspended(&self) -> bool {
        self.proxy.mirror().is_suspended()
    }

    pub fn watch_flags(&self) -> watch::Receiver<SessionSnapshot> {
        self.proxy.mirror().watch_flags()
    }

    pub fn watch_evaluator(&self) -> watch::Receiver<Option<Arc<FrontendEvaluator>>> {
        self.proxy.mirror().watch_evaluator()
    }

    pub fn watch_source_position(&self) -> watch::Receiver<Option<Arc<SourcePosition>>> {
        self.proxy.mirror().watch_source_position()
    }

    pub fn tab_state(&self) -> TabState {
        *self.tab_state.borrow()
    }

    pub fn watch_tab_state(&self) -> watch::Receiver<TabState> {
        self.tab_state.clone()
    }

    pub fn has_tab(&self) -> bool {
        self.proxy.has_tab()
    }

    /// Most recent pause delivered to the tab.
    pub fn last_pause(&self) -> Option<PausedEvent> {
        *self.proxy.inner.pauses.borrow()
    }

    pub fn watch_pauses(&self) -> watch::Receiver<Option<PausedEvent>> {
        self.proxy.inner.pauses.subscribe()
    }

    /// Mirror another remote stream under this session's scope.
    ///
    /// Intended for session data whose wire contract lives outside this
    /// crate (restart actions, console, process handle).
    pub fn mirror_stream<P>(
        &self,
        name: &'static str,
        source: BoxStream<'static, P::Update>,
        projection: P,
        initial: P::Value,
    ) -> Result<Projector<P::Value>>
    where
        P: Projection,
    {
        self.ensure_open()?;
        Ok(Projector::start(&self.scope, name, source, projection, initial))
    }

    /// Cancel every subscription and materialized object of the session.
    ///
    /// Idempotent. The tab is dropped on the UI context once queued UI work
    /// has run. Called on the UI context, no callback of this session runs
    /// afterwards; from elsewhere, use [`shutdown`](Self::shutdown) for that
    /// guarantee.
    pub fn close_scope(&self) {
        self.scope.cancel();
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(session = %self.id(), "session mirror closed");
            self.release_tab();
        }
    }

    /// Queue the tab release on the UI context, or release it here when the
    /// UI context is gone.
    fn release_tab(&self) {
        let proxy = self.proxy.clone();
        if self
            .ui
            .dispatch(Box::new(move || proxy.inner.tab.release()))
            .is_err()
        {
            debug!(session = %self.id(), "UI context gone, releasing tab here");
            self.proxy.inner.tab.release();
        }
    }

    /// Close the scope, wait for every session task to finish and drain the
    /// UI queue, then drop the tab on the UI context.
    pub async fn shutdown(&self) -> Result<()> {
        self.close_scope();

        if tokio::time::timeout(self.options.join_timeout, self.scope.close())
            .await
            .is_err()
        {
            warn!(session = %self.id(), tasks = self.scope.active_tasks(), "session tasks did not finish in time");
            return Err(MirrorError::Timeout);
        }

        let proxy = self.proxy.clone();
        match run_on_ui(self.ui.as_ref(), move || proxy.inner.tab.release()).await {
            Ok(()) => {}
            Err(MirrorError::UiUnavailable) => {
                debug!(session = %self.id(), "UI context gone, releasing tab here");
                self.proxy.inner.tab.release();
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(MirrorError::SessionClosed(self.id().to_string()))
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for FrontendSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrontendSession")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("project", &self.project)
            .field("closed", &self.is_closed())
            .field("tab_state", &self.tab_state())
            .finish()
    }
}

impl Drop for FrontendSession {
    fn drop(&mut self) {
        self.close_scope();
    }
}
