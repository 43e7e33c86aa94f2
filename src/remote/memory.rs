//! Channel-backed backend living in the same process.
//!
//! Used by the scenario runner and the tests. Every subscription gets its own
//! unbounded channel; value streams replay their latest snapshot to new
//! subscribers, the tab stream does not.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::types::{
    EvaluationResult, EvaluatorDescriptor, EvaluatorId, PausedEvent, SourcePositionDescriptor,
    TabDescriptor, TabInfo,
};
use super::{EvaluationBackend, RemoteSessionSource};
use crate::error::MirrorError;
use crate::session::{SessionId, SessionSnapshot};
use crate::Result;

fn receiver_stream<T: Send + 'static>(rx: mpsc::UnboundedReceiver<T>) -> BoxStream<'static, T> {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}

struct Feed<T> {
    latest: Option<T>,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self {
            latest: None,
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone + Send + 'static> Feed<T> {
    fn subscribe(&mut self) -> BoxStream<'static, T> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(latest) = &self.latest {
            let _ = tx.send(latest.clone());
        }
        self.subscribers.push(tx);
        receiver_stream(rx)
    }

    fn publish(&mut self, value: T) {
        self.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
        self.latest = Some(value);
    }

    fn open_subscribers(&mut self) -> usize {
        self.subscribers.retain(|tx| !tx.is_closed());
        self.subscribers.len()
    }
}

#[derive(Default)]
struct SessionFeeds {
    evaluator: Feed<Option<EvaluatorDescriptor>>,
    position: Feed<Option<SourcePositionDescriptor>>,
    state: Feed<SessionSnapshot>,
    tabs: Vec<mpsc::UnboundedSender<Option<TabDescriptor>>>,
}

impl SessionFeeds {
    fn open_subscribers(&mut self) -> usize {
        self.tabs.retain(|tx| !tx.is_closed());
        self.evaluator.open_subscribers()
            + self.position.open_subscribers()
            + self.state.open_subscribers()
            + self.tabs.len()
    }
}

#[derive(Default)]
struct EvaluationState {
    refused: HashSet<EvaluatorId>,
    values: HashMap<String, String>,
    delay: Option<Duration>,
    attached: usize,
}

/// Sender side of the pause stream attached to an offered tab.
#[derive(Clone, Default)]
pub struct PausedFeed {
    senders: Vec<mpsc::UnboundedSender<Option<PausedEvent>>>,
}

impl PausedFeed {
    /// Report a pause to every tab built from the offer.
    pub fn pause(&self, paused_by_user: bool, top_frame_absent: bool) {
        self.send(Some(PausedEvent {
            paused_by_user,
            top_frame_absent,
        }));
    }

    /// Send a raw event; `None` is delivered as-is.
    pub fn send(&self, event: Option<PausedEvent>) {
        for tx in &self.senders {
            let _ = tx.send(event);
        }
    }

    /// Number of pause streams still being listened to.
    pub fn listeners(&self) -> usize {
        self.senders.iter().filter(|tx| !tx.is_closed()).count()
    }
}

/// In-process backend implementing both remote collaborator traits.
#[derive(Default)]
pub struct InMemoryBackend {
    sessions: Mutex<HashMap<SessionId, SessionFeeds>>,
    evaluation: Mutex<EvaluationState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_session<R>(&self, id: SessionId, f: impl FnOnce(&mut SessionFeeds) -> R) -> Result<R> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| MirrorError::LockPoisoned)?;
        Ok(f(sessions.entry(id).or_default()))
    }

    fn subscribe<T>(&self, id: SessionId, f: impl FnOnce(&mut SessionFeeds) -> BoxStream<'static, T>) -> BoxStream<'static, T>
    where
        T: Send + 'static,
    {
        match self.with_session(id, f) {
            Ok(stream) => stream,
            Err(e) => {
                error!(session = %id, error = %e, "subscription refused");
                stream::empty().boxed()
            }
        }
    }

    /// Publish the evaluator of the current suspend context.
    pub fn publish_evaluator(&self, id: SessionId, evaluator: Option<EvaluatorDescriptor>) -> Result<()> {
        debug!(session = %id, ?evaluator, "publish evaluator");
        self.with_session(id, |feeds| feeds.evaluator.publish(evaluator))
    }

    /// Publish the current source position.
    pub fn publish_source_position(
        &self,
        id: SessionId,
        position: Option<SourcePositionDescriptor>,
    ) -> Result<()> {
        debug!(session = %id, ?position, "publish source position");
        self.with_session(id, |feeds| feeds.position.publish(position))
    }

    /// Publish a new flags snapshot.
    pub fn publish_state(&self, id: SessionId, state: SessionSnapshot) -> Result<()> {
        debug!(session = %id, ?state, "publish session state");
        self.with_session(id, |feeds| feeds.state.publish(state))
    }

    /// Offer a tab descriptor (or `None`) to current tab subscribers.
    ///
    /// Offers are not replayed. The returned feed drives the pause stream of
    /// the tab built from this offer.
    pub fn offer_tab(&self, id: SessionId, info: Option<TabInfo>) -> Result<PausedFeed> {
        debug!(session = %id, ?info, "offer tab");
        self.with_session(id, |feeds| {
            let mut paused = PausedFeed::default();
            feeds.tabs.retain(|tx| {
                let descriptor = info.clone().map(|info| {
                    let (paused_tx, paused_rx) = mpsc::unbounded_channel();
                    paused.senders.push(paused_tx);
                    TabDescriptor {
                        info,
                        paused: receiver_stream(paused_rx),
                    }
                });
                tx.send(descriptor).is_ok()
            });
            paused
        })
    }

    /// End every stream of a session, as a dropped connection would.
    pub fn end_streams(&self, id: SessionId) -> Result<()> {
        debug!(session = %id, "end streams");
        self.with_session(id, |feeds| {
            feeds.evaluator.subscribers.clear();
            feeds.position.subscribers.clear();
            feeds.state.subscribers.clear();
            feeds.tabs.clear();
        })
    }

    /// Number of subscriptions of a session that still have a listener.
    pub fn open_subscriptions(&self, id: SessionId) -> usize {
        self.with_session(id, SessionFeeds::open_subscribers)
            .unwrap_or(0)
    }

    /// Make `attach` fail for the given evaluator.
    pub fn refuse_evaluator(&self, evaluator: EvaluatorId) -> Result<()> {
        let mut state = self
            .evaluation
            .lock()
            .map_err(|_| MirrorError::LockPoisoned)?;
        state.refused.insert(evaluator);
        Ok(())
    }

    /// Define the value returned when `expression` is evaluated.
    pub fn define_value(&self, expression: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let mut state = self
            .evaluation
            .lock()
            .map_err(|_| MirrorError::LockPoisoned)?;
        state.values.insert(expression.into(), value.into());
        Ok(())
    }

    /// Delay every evaluation, to exercise revocation mid-flight.
    pub fn set_evaluation_delay(&self, delay: Option<Duration>) -> Result<()> {
        let mut state = self
            .evaluation
            .lock()
            .map_err(|_| MirrorError::LockPoisoned)?;
        state.delay = delay;
        Ok(())
    }

    /// Number of successful evaluator attachments.
    pub fn attached_evaluators(&self) -> usize {
        self.evaluation.lock().map(|s| s.attached).unwrap_or(0)
    }
}

impl RemoteSessionSource for InMemoryBackend {
    fn evaluator_updates(&self, session: SessionId) -> BoxStream<'static, Option<EvaluatorDescriptor>> {
        self.subscribe(session, |feeds| feeds.evaluator.subscribe())
    }

    fn source_position_updates(
        &self,
        session: SessionId,
    ) -> BoxStream<'static, Option<SourcePositionDescriptor>> {
        self.subscribe(session, |feeds| feeds.position.subscribe())
    }

    fn session_state_updates(&self, session: SessionId) -> BoxStream<'static, SessionSnapshot> {
        self.subscribe(session, |feeds| feeds.state.subscribe())
    }

    fn tab_info_updates(&self, session: SessionId) -> BoxStream<'static, Option<TabDescriptor>> {
        self.subscribe(session, |feeds| {
            let (tx, rx) = mpsc::unbounded_channel();
            feeds.tabs.push(tx);
            receiver_stream(rx)
        })
    }
}

#[async_trait]
impl EvaluationBackend for InMemoryBackend {
    async fn attach(&self, session: SessionId, evaluator: &EvaluatorDescriptor) -> Result<()> {
        let mut state = self
            .evaluation
            .lock()
            .map_err(|_| MirrorError::LockPoisoned)?;
        if state.refused.contains(&evaluator.id) {
            return Err(MirrorError::Materialization(format!(
                "backend refused {} for {}",
                evaluator.id, session
            )));
        }
        state.attached += 1;
        Ok(())
    }

    async fn evaluate(
        &self,
        session: SessionId,
        evaluator: EvaluatorId,
        expression: &str,
    ) -> Result<EvaluationResult> {
        let (delay, value) = {
            let state = self
                .evaluation
                .lock()
                .map_err(|_| MirrorError::LockPoisoned)?;
            (state.delay, state.values.get(expression).cloned())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        debug!(session = %session, %evaluator, expression, "evaluate");
        value
            .map(|value| EvaluationResult {
                value,
                type_name: None,
            })
            .ok_or_else(|| MirrorError::Evaluation(format!("cannot evaluate '{}'", expression)))
    }
}
