//! Locally readable mirror of the backend session state.

use std::sync::Arc;

use tokio::sync::watch;

use super::evaluator::{EvaluatorProjection, FrontendEvaluator};
use super::position::{SourcePosition, SourcePositionProjection};
use super::{SessionId, SessionSnapshot};
use crate::projector::{PassThrough, Projector};
use crate::remote::{EvaluationBackend, RemoteSessionSource};
use crate::scope::Scope;

/// Three projectors (evaluator, source position, flags) started eagerly and
/// bound to the session scope.
///
/// All reads are non-blocking and return whatever was published last. The
/// flag predicates each read the latest snapshot on their own; read
/// [`current_flags`](Self::current_flags) once when several flags must agree.
pub struct SessionStateMirror {
    evaluator: Projector<Option<Arc<FrontendEvaluator>>>,
    source_position: Projector<Option<Arc<SourcePosition>>>,
    flags: Projector<SessionSnapshot>,
}

impl SessionStateMirror {
    pub fn start(
        scope: &Scope,
        id: SessionId,
        initial_flags: SessionSnapshot,
        remote: &dyn RemoteSessionSource,
        evaluation: Arc<dyn EvaluationBackend>,
    ) -> Self {
        let evaluator = Projector::start(
            scope,
            "evaluator",
            remote.evaluator_updates(id),
            EvaluatorProjection::new(id, evaluation),
            None,
        );
        let source_position = Projector::start(
            scope,
            "source-position",
            remote.source_position_updates(id),
            SourcePositionProjection,
            None,
        );
        let flags = Projector::start(
            scope,
            "flags",
            remote.session_state_updates(id),
            PassThrough::new(),
            initial_flags,
        );

        Self {
            evaluator,
            source_position,
            flags,
        }
    }

    pub fn current_evaluator(&self) -> Option<Arc<FrontendEvaluator>> {
        self.evaluator.current()
    }

    pub fn current_source_position(&self) -> Option<Arc<SourcePosition>> {
        self.source_position.current()
    }

    /// Latest flags; the initial snapshot until the first update arrives.
    pub fn current_flags(&self) -> SessionSnapshot {
        self.flags.current()
    }

    pub fn is_stopped(&self) -> bool {
        self.current_flags().is_stopped()
    }

    pub fn is_paused(&self) -> bool {
        self.current_flags().is_paused()
    }

    pub fn is_read_only(&self) -> bool {
        self.current_flags().is_read_only()
    }

    pub fn is_pause_action_supported(&self) -> bool {
        self.current_flags().is_pause_action_supported()
    }

    pub fn is_suspended(&self) -> bool {
        self.current_flags().is_suspended()
    }

    pub fn watch_evaluator(&self) -> watch::Receiver<Option<Arc<FrontendEvaluator>>> {
        self.evaluator.subscribe()
    }

    pub fn watch_source_position(&self) -> watch::Receiver<Option<Arc<SourcePosition>>> {
        self.source_position.subscribe()
    }

    pub fn watch_flags(&self) -> watch::Receiver<SessionSnapshot> {
        self.flags.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{EvaluatorDescriptor, EvaluatorId, InMemoryBackend, SourcePositionDescriptor};
    use std::time::Duration;

    async fn settle<V, F>(mut rx: watch::Receiver<V>, pred: F)
    where
        F: FnMut(&V) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(pred))
            .await
            .expect("timed out")
            .expect("closed");
    }

    #[tokio::test]
    async fn test_initial_flags_before_updates() {
        let backend = Arc::new(InMemoryBackend::new());
        let scope = Scope::root("test");
        let id = SessionId::from_raw(1);
        let initial = SessionSnapshot {
            read_only: true,
            ..SessionSnapshot::running()
        };
        let mirror = SessionStateMirror::start(&scope, id, initial, backend.as_ref(), backend.clone());

        assert_eq!(mirror.current_flags(), initial);
        assert!(mirror.is_read_only());
        assert!(mirror.current_evaluator().is_none());
        assert!(mirror.current_source_position().is_none());
        scope.cancel();
    }

    #[tokio::test]
    async fn test_projectors_follow_backend() {
        let backend = Arc::new(InMemoryBackend::new());
        let scope = Scope::root("test");
        let id = SessionId::from_raw(2);
        let mirror = SessionStateMirror::start(
            &scope,
            id,
            SessionSnapshot::running(),
            backend.as_ref(),
            backend.clone(),
        );

        backend
            .publish_state(
                id,
                SessionSnapshot {
                    paused: true,
                    suspended: true,
                    ..SessionSnapshot::running()
                },
            )
            .unwrap();
        backend
            .publish_evaluator(
                id,
                Some(EvaluatorDescriptor {
                    id: EvaluatorId(5),
                    can_evaluate_in_document: false,
                }),
            )
            .unwrap();
        backend
            .publish_source_position(
                id,
                Some(SourcePositionDescriptor {
                    file_url: "file:///lib.rs".into(),
                    line: 3,
                    offset: Some(12),
                }),
            )
            .unwrap();

        settle(mirror.watch_flags(), |f| f.is_paused()).await;
        settle(mirror.watch_evaluator(), |e| e.is_some()).await;
        settle(mirror.watch_source_position(), |p| p.is_some()).await;

        assert!(mirror.is_suspended());
        assert!(mirror.is_pause_action_supported());
        assert!(!mirror.is_stopped());
        assert_eq!(mirror.current_evaluator().unwrap().id(), EvaluatorId(5));
        assert_eq!(mirror.current_source_position().unwrap().offset(), Some(12));
        scope.cancel();
    }
}
