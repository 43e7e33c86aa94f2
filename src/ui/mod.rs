//! UI-affine execution context.
//!
//! Tab construction and pause callbacks must run on the context that owns the
//! UI. Background tasks hand work over through a [`UiDispatcher`] and, where
//! they depend on the result, await it with [`run_on_ui`]. The UI side never
//! waits for background work.

mod tab;
mod thread;

pub use tab::{DebugTab, TabFactory, TabSlot};
pub use thread::UiThread;

use tokio::sync::oneshot;

use crate::error::MirrorError;
use crate::Result;

/// A unit of work for the UI context.
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Serial executor owning the UI.
pub trait UiDispatcher: Send + Sync + 'static {
    /// Queue `job`; jobs run one at a time in submission order.
    fn dispatch(&self, job: UiJob) -> Result<()>;

    /// Whether the caller is currently running on the UI context.
    fn is_ui_context(&self) -> bool;
}

/// Run `f` on the UI context and wait for its result.
///
/// Fails with [`MirrorError::UiUnavailable`] when the UI context is gone or
/// drops the job without running it.
pub async fn run_on_ui<F, R>(ui: &dyn UiDispatcher, f: F) -> Result<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    ui.dispatch(Box::new(move || {
        let _ = tx.send(f());
    }))?;
    rx.await.map_err(|_| MirrorError::UiUnavailable)
}

/// Wait until every job queued before this call has run.
pub async fn flush(ui: &dyn UiDispatcher) -> Result<()> {
    run_on_ui(ui, || ()).await
}
