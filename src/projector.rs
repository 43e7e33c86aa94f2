//! Latest-value projection of remote snapshot streams.
//!
//! A [`Projector`] listens to a stream of snapshots and keeps one
//! observable "current value" cell. Incoming snapshots land in a single-slot
//! mailbox that always holds the newest one; a consumer loop drains it,
//! cancels the scope of the previously materialized value, then materializes
//! and publishes the new one. Snapshots that are overwritten before the
//! consumer gets to them are skipped.

use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::{FutureExt, StreamExt};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::scope::Scope;
use crate::Result;

/// Turns remote snapshots into locally published values.
#[async_trait]
pub trait Projection: Send + Sync + 'static {
    /// Snapshot type delivered by the remote stream.
    type Update: Clone + Send + Sync + 'static;
    /// Value type held by the projector's cell.
    type Value: Clone + Send + Sync + 'static;

    /// Build the value for `update`.
    ///
    /// `scope` belongs to the new value. It is cancelled when the value is
    /// superseded, when materialization fails, or when the projector stops,
    /// so anything the value spawns should hang off it.
    async fn materialize(&self, update: Self::Update, scope: &Scope) -> Result<Self::Value>;

    /// Value published after a failed materialization or once the upstream
    /// stream ends. `None` keeps the last published value.
    fn fallback(&self) -> Option<Self::Value> {
        None
    }
}

/// Projection that publishes every snapshot unchanged.
pub struct PassThrough<T>(PhantomData<fn() -> T>);

impl<T> PassThrough<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for PassThrough<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Projection for PassThrough<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Update = T;
    type Value = T;

    async fn materialize(&self, update: T, _scope: &Scope) -> Result<T> {
        Ok(update)
    }
}

/// A running projection with its current-value cell.
pub struct Projector<V> {
    name: &'static str,
    scope: Scope,
    cell: watch::Receiver<V>,
}

impl<V> Projector<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Start projecting `source` under a child of `parent`.
    ///
    /// The cell holds `initial` until the first snapshot is materialized.
    pub fn start<P>(
        parent: &Scope,
        name: &'static str,
        source: BoxStream<'static, P::Update>,
        projection: P,
        initial: V,
    ) -> Self
    where
        P: Projection<Value = V>,
    {
        let scope = parent.child(name);
        let (cell_tx, cell_rx) = watch::channel(initial);
        let (slot_tx, slot_rx) = watch::channel::<Option<P::Update>>(None);

        scope.spawn("ingest", ingest(source, slot_tx));
        scope.spawn(
            "materialize",
            consume(scope.clone(), slot_rx, projection, cell_tx),
        );
        debug!(projector = scope.name(), "projector started");

        Self {
            name,
            scope,
            cell: cell_rx,
        }
    }

    /// Latest published value. Never blocks on the remote side.
    pub fn current(&self) -> V {
        self.cell.borrow().clone()
    }

    /// Receiver for observing future publications.
    pub fn subscribe(&self) -> watch::Receiver<V> {
        self.cell.clone()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Scope owning the listener and every materialized value.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

async fn ingest<U>(mut source: BoxStream<'static, U>, slot: watch::Sender<Option<U>>)
where
    U: Send + Sync + 'static,
{
    while let Some(update) = source.next().await {
        slot.send_replace(Some(update));
    }
}

async fn consume<P>(
    scope: Scope,
    mut slot: watch::Receiver<Option<P::Update>>,
    projection: P,
    cell: watch::Sender<P::Value>,
) where
    P: Projection,
{
    let mut live: Option<Scope> = None;
    let mut generation: u64 = 0;

    loop {
        if slot.changed().await.is_err() {
            debug!(projector = scope.name(), "upstream ended");
            if let Some(fallback) = projection.fallback() {
                if let Some(old) = live.take() {
                    old.cancel();
                }
                cell.send_replace(fallback);
            }
            return;
        }

        let update = slot.borrow_and_update().clone();
        let Some(update) = update else {
            continue;
        };

        // The previous value must be gone before the next one starts work.
        if let Some(old) = live.take() {
            old.cancel();
        }

        generation += 1;
        let value_scope = scope.child(format!("#{}", generation));
        let mut newer = slot.clone();
        let superseded = async move {
            if newer.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = superseded => None,
            result = AssertUnwindSafe(projection.materialize(update, &value_scope)).catch_unwind() => Some(result),
        };

        match outcome {
            None => {
                value_scope.cancel();
                trace!(projector = scope.name(), generation, "superseded while materializing");
            }
            Some(Ok(Ok(value))) => {
                live = Some(value_scope);
                cell.send_replace(value);
                trace!(projector = scope.name(), generation, "published");
            }
            Some(Ok(Err(err))) => {
                value_scope.cancel();
                warn!(projector = scope.name(), generation, error = %err, "materialization failed");
                if let Some(fallback) = projection.fallback() {
                    cell.send_replace(fallback);
                }
            }
            Some(Err(_panic)) => {
                value_scope.cancel();
                warn!(projector = scope.name(), generation, "materialization panicked");
                if let Some(fallback) = projection.fallback() {
                    cell.send_replace(fallback);
                }
            }
        }
    }
}
