//! Backend collaborator contract.
//!
//! The backend owns the debug session; the frontend only subscribes to its
//! snapshot streams. Transport is not modeled here: any RPC layer that can
//! deliver ordered snapshots per session implements [`RemoteSessionSource`].

mod memory;
mod types;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

pub use memory::{InMemoryBackend, PausedFeed};
pub use types::{
    EditorsProviderDto, EvaluationResult, EvaluatorDescriptor, EvaluatorId, PausedEvent,
    PausedEventStream, SessionDto, SessionTabInfo, SourcePositionDescriptor, TabDescriptor,
    TabInfo,
};

use crate::session::{SessionId, SessionSnapshot};
use crate::Result;

/// Per-session snapshot streams published by the backend.
///
/// Each call opens an independent subscription; dropping the stream ends it.
pub trait RemoteSessionSource: Send + Sync + 'static {
    /// Evaluator of the current suspend context, `None` while running.
    fn evaluator_updates(&self, session: SessionId) -> BoxStream<'static, Option<EvaluatorDescriptor>>;

    /// Current execution position, `None` when there is none.
    fn source_position_updates(
        &self,
        session: SessionId,
    ) -> BoxStream<'static, Option<SourcePositionDescriptor>>;

    /// Coarse session flags.
    fn session_state_updates(&self, session: SessionId) -> BoxStream<'static, SessionSnapshot>;

    /// Tab descriptor; `None` until the backend has a tab to offer.
    fn tab_info_updates(&self, session: SessionId) -> BoxStream<'static, Option<TabDescriptor>>;
}

/// Remote expression evaluation.
#[async_trait]
pub trait EvaluationBackend: Send + Sync + 'static {
    /// Prepare the backend side of an evaluator before it is handed out.
    async fn attach(&self, session: SessionId, evaluator: &EvaluatorDescriptor) -> Result<()>;

    /// Evaluate `expression` in the evaluator's suspend context.
    async fn evaluate(
        &self,
        session: SessionId,
        evaluator: EvaluatorId,
        expression: &str,
    ) -> Result<EvaluationResult>;
}
