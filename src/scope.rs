//! Cancellable lifetime scopes.
//!
//! A [`Scope`] groups background work under one cancellation token. Child
//! scopes hold child tokens, so cancelling a node cancels every descendant
//! before `cancel` returns. Tasks spawned through a scope are registered with
//! the task tracker of that scope and of every ancestor, which lets
//! [`Scope::close`] join the whole subtree.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::trace;

/// A node in the cancellation tree.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    name: String,
    token: CancellationToken,
    tracker: TaskTracker,
    parent: Option<Scope>,
}

impl Scope {
    /// Create a new root scope.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                name: name.into(),
                token: CancellationToken::new(),
                tracker: TaskTracker::new(),
                parent: None,
            }),
        }
    }

    /// Create a child scope that is cancelled together with this one.
    ///
    /// A child of an already cancelled scope starts out cancelled.
    pub fn child(&self, name: impl AsRef<str>) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                name: format!("{}/{}", self.inner.name, name.as_ref()),
                token: self.inner.token.child_token(),
                tracker: TaskTracker::new(),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Hierarchical name, e.g. `session dbg-00000001/evaluator`.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Cancel this scope and all of its descendants.
    ///
    /// Idempotent. Spawned futures are dropped at their next poll.
    pub fn cancel(&self) {
        if !self.inner.token.is_cancelled() {
            trace!(scope = %self.inner.name, "scope cancelled");
        }
        self.inner.token.cancel();
    }

    /// Check whether this scope (or an ancestor) has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Wait until this scope is cancelled.
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await
    }

    /// Clone of the underlying cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Number of live tasks spawned in this scope or its descendants.
    pub fn active_tasks(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Spawn a task bound to this scope.
    ///
    /// The future is dropped as soon as the scope is cancelled; if the scope
    /// is already cancelled it never runs.
    pub fn spawn<F>(&self, task: &'static str, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.inner.token.clone();
        let scope_name = self.inner.name.clone();
        let guarded = async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!(scope = %scope_name, task, "task stopped by cancellation");
                }
                _ = fut => {
                    trace!(scope = %scope_name, task, "task finished");
                }
            }
        };
        tokio::spawn(self.track(guarded.boxed()))
    }

    fn track(&self, fut: BoxFuture<'static, ()>) -> BoxFuture<'static, ()> {
        let tracked = self.inner.tracker.track_future(fut).boxed();
        match &self.inner.parent {
            Some(parent) => parent.track(tracked),
            None => tracked,
        }
    }

    /// Cancel the scope and wait for every task in the subtree to finish.
    pub async fn close(&self) {
        self.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.inner.name)
            .field("cancelled", &self.is_cancelled())
            .field("active_tasks", &self.active_tasks())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_child_names() {
        let root = Scope::root("session dbg-00000001");
        let child = root.child("evaluator");
        assert_eq!(child.name(), "session dbg-00000001/evaluator");
    }

    #[test]
    fn test_cancel_cascades_to_children() {
        let root = Scope::root("root");
        let child = root.child("a");
        let grandchild = child.child("b");

        root.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn test_child_cancel_leaves_parent_alive() {
        let root = Scope::root("root");
        let child = root.child("a");
        let sibling = root.child("b");

        child.cancel();
        assert!(!root.is_cancelled());
        assert!(!sibling.is_cancelled());
    }

    #[test]
    fn test_child_of_cancelled_scope_is_cancelled() {
        let root = Scope::root("root");
        root.cancel();
        root.cancel();
        assert!(root.child("late").is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_drops_pending_task() {
        let root = Scope::root("root");
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(dropped.clone());

        let handle = root.spawn("pending", async move {
            let _flag = flag;
            std::future::pending::<()>().await;
        });

        root.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_close_joins_descendant_tasks() {
        let root = Scope::root("root");
        let child = root.child("worker");
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(dropped.clone());

        child.spawn("pending", async move {
            let _flag = flag;
            std::future::pending::<()>().await;
        });
        assert_eq!(root.active_tasks(), 1);

        tokio::time::timeout(Duration::from_secs(1), root.close())
            .await
            .unwrap();
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(root.active_tasks(), 0);
    }

    #[tokio::test]
    async fn test_spawn_after_cancel_never_runs() {
        let root = Scope::root("root");
        root.cancel();

        let (tx, rx) = oneshot::channel::<()>();
        let handle = root.spawn("late", async move {
            let _ = tx.send(());
        });
        handle.await.unwrap();
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_finished_task_leaves_tracker() {
        let root = Scope::root("root");
        root.spawn("quick", async {}).await.unwrap();
        assert_eq!(root.active_tasks(), 0);
    }
}
