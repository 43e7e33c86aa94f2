//! Dedicated UI thread.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;
use tracing::{debug, error};

use super::{UiDispatcher, UiJob};
use crate::error::MirrorError;
use crate::Result;

/// A UI context backed by one OS thread draining a job queue.
///
/// The thread exits once the last `UiThread` handle is dropped and the queue
/// is empty. A panicking job is logged and does not take the thread down.
pub struct UiThread {
    tx: mpsc::UnboundedSender<UiJob>,
    thread_id: ThreadId,
}

impl UiThread {
    /// Spawn the UI thread.
    pub fn spawn(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<UiJob>();

        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            debug!(thread = %name, "UI thread started");
            while let Some(job) = rx.blocking_recv() {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!(thread = %name, "UI job panicked");
                }
            }
            debug!(thread = %name, "UI thread stopped");
        })?;

        Ok(Self {
            tx,
            thread_id: handle.thread().id(),
        })
    }
}

impl UiDispatcher for UiThread {
    fn dispatch(&self, job: UiJob) -> Result<()> {
        self.tx.send(job).map_err(|_| MirrorError::UiUnavailable)
    }

    fn is_ui_context(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{flush, run_on_ui};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_run_on_ui_returns_value() {
        let ui = UiThread::spawn("test-ui").unwrap();
        let value = run_on_ui(&ui, || 40 + 2).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_jobs_run_on_ui_thread() {
        let ui = Arc::new(UiThread::spawn("test-ui").unwrap());
        assert!(!ui.is_ui_context());

        let probe = ui.clone();
        let on_ui = run_on_ui(ui.as_ref(), move || probe.is_ui_context())
            .await
            .unwrap();
        assert!(on_ui);
    }

    #[tokio::test]
    async fn test_jobs_run_in_order() {
        let ui = UiThread::spawn("test-ui").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for n in 0..10 {
            let seen = seen.clone();
            ui.dispatch(Box::new(move || seen.lock().unwrap().push(n)))
                .unwrap();
        }
        flush(&ui).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_panicking_job_keeps_thread_alive() {
        let ui = UiThread::spawn("test-ui").unwrap();
        let result = run_on_ui(&ui, || -> u32 { panic!("boom") }).await;
        assert!(matches!(result, Err(MirrorError::UiUnavailable)));
        assert_eq!(run_on_ui(&ui, || 1).await.unwrap(), 1);
    }
}
