//! Frontend handle over the backend's current evaluator.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::MirrorError;
use crate::projector::Projection;
use crate::remote::{EvaluationBackend, EvaluationResult, EvaluatorDescriptor, EvaluatorId};
use crate::scope::Scope;
use crate::session::SessionId;
use crate::Result;

/// Evaluation capability of one suspend context.
///
/// Valid until the next evaluator snapshot arrives or the session closes;
/// after that every call fails with [`MirrorError::EvaluatorRevoked`], even
/// if the handle is still referenced somewhere.
pub struct FrontendEvaluator {
    session: SessionId,
    descriptor: EvaluatorDescriptor,
    scope: Scope,
    backend: Arc<dyn EvaluationBackend>,
}

impl FrontendEvaluator {
    pub fn id(&self) -> EvaluatorId {
        self.descriptor.id
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn can_evaluate_in_document(&self) -> bool {
        self.descriptor.can_evaluate_in_document
    }

    /// Whether a newer snapshot (or shutdown) has invalidated this handle.
    pub fn is_revoked(&self) -> bool {
        self.scope.is_cancelled()
    }

    /// Evaluate an expression in this evaluator's suspend context.
    ///
    /// An evaluation in flight when the handle is revoked is abandoned.
    pub async fn evaluate(&self, expression: &str) -> Result<EvaluationResult> {
        if self.is_revoked() {
            return Err(MirrorError::EvaluatorRevoked);
        }
        tokio::select! {
            biased;
            _ = self.scope.cancelled() => Err(MirrorError::EvaluatorRevoked),
            result = self.backend.evaluate(self.session, self.descriptor.id, expression) => result,
        }
    }
}

impl fmt::Debug for FrontendEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrontendEvaluator")
            .field("session", &self.session)
            .field("id", &self.descriptor.id)
            .field("revoked", &self.is_revoked())
            .finish()
    }
}

/// Materializes evaluator snapshots into [`FrontendEvaluator`] handles.
pub struct EvaluatorProjection {
    session: SessionId,
    backend: Arc<dyn EvaluationBackend>,
}

impl EvaluatorProjection {
    pub fn new(session: SessionId, backend: Arc<dyn EvaluationBackend>) -> Self {
        Self { session, backend }
    }
}

#[async_trait]
impl Projection for EvaluatorProjection {
    type Update = Option<EvaluatorDescriptor>;
    type Value = Option<Arc<FrontendEvaluator>>;

    async fn materialize(
        &self,
        update: Option<EvaluatorDescriptor>,
        scope: &Scope,
    ) -> Result<Option<Arc<FrontendEvaluator>>> {
        let Some(descriptor) = update else {
            return Ok(None);
        };
        self.backend.attach(self.session, &descriptor).await?;
        Ok(Some(Arc::new(FrontendEvaluator {
            session: self.session,
            descriptor,
            scope: scope.clone(),
            backend: self.backend.clone(),
        })))
    }

    fn fallback(&self) -> Option<Option<Arc<FrontendEvaluator>>> {
        Some(None)
    }
}
