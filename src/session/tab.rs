//! Session tab lifecycle.
//!
//! The controller waits for the first usable tab descriptor, builds the tab
//! on the UI context, hooks the descriptor's pause stream to the tab and then
//! cancels its own descriptor subscription. Later descriptors are never read.

use std::sync::Arc;

use futures_util::stream::{BoxStream, StreamExt};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use super::{SessionProxy, TabState};
use crate::error::MirrorError;
use crate::remote::{PausedEventStream, SessionTabInfo, TabDescriptor, TabInfo};
use crate::scope::Scope;
use crate::ui::{run_on_ui, TabFactory, UiDispatcher};
use crate::Result;

pub(crate) struct TabController {
    session: SessionProxy,
    scope: Scope,
    ui: Arc<dyn UiDispatcher>,
    factory: Arc<dyn TabFactory>,
    state: watch::Sender<TabState>,
}

impl TabController {
    pub(crate) fn new(
        session: SessionProxy,
        scope: Scope,
        ui: Arc<dyn UiDispatcher>,
        factory: Arc<dyn TabFactory>,
    ) -> (Self, watch::Receiver<TabState>) {
        let (state, state_rx) = watch::channel(TabState::default());
        let controller = Self {
            session,
            scope,
            ui,
            factory,
            state,
        };
        (controller, state_rx)
    }

    /// Start listening for descriptors under a child of the session scope.
    pub(crate) fn start(self, descriptors: BoxStream<'static, Option<TabDescriptor>>) {
        let subscription = self.scope.child("tab-descriptor");
        let handle = subscription.clone();
        subscription.spawn("tab-descriptor", self.run(descriptors, handle));
    }

    async fn run(self, mut descriptors: BoxStream<'static, Option<TabDescriptor>>, subscription: Scope) {
        let session = self.session.id();
        while let Some(descriptor) = descriptors.next().await {
            let Some(TabDescriptor { info, paused }) = descriptor else {
                trace!(%session, "no tab offered yet");
                continue;
            };

            let done = match info {
                TabInfo::NoTab => {
                    self.transition(TabState::Skipped);
                    info!(%session, "backend offered no tab");
                    true
                }
                TabInfo::Session(info) => self.attach(info, paused).await,
            };

            if done {
                // Only one tab per session.
                subscription.cancel();
                return;
            }
        }
        debug!(%session, "tab descriptor stream ended");
    }

    /// Build the tab and wire its pause stream. Returns `false` if the
    /// controller should keep waiting for another descriptor.
    async fn attach(&self, info: SessionTabInfo, paused: PausedEventStream) -> bool {
        let session = self.session.id();
        self.transition(TabState::Constructing);

        match self.construct(info).await {
            Ok(()) => {
                let tab_scope = self.scope.child("tab");
                tab_scope.spawn(
                    "paused-events",
                    forward_pauses(paused, self.ui.clone(), tab_scope.clone(), self.session.clone()),
                );
                self.transition(TabState::Attached);
                info!(%session, "session tab attached");
                true
            }
            Err(err) => {
                warn!(%session, error = %err, "tab construction failed");
                self.transition(TabState::WaitingForDescriptor);
                false
            }
        }
    }

    async fn construct(&self, info: SessionTabInfo) -> Result<()> {
        let proxy = self.session.clone();
        let factory = self.factory.clone();
        let gate = self.scope.clone();

        run_on_ui(self.ui.as_ref(), move || {
            if gate.is_cancelled() {
                return Err(MirrorError::SessionClosed(proxy.id().to_string()));
            }
            let tab = factory.create_tab(&proxy, &info)?;
            if !proxy.on_tab_initialized(tab) {
                return Err(MirrorError::TabConstruction("tab already installed".into()));
            }
            if info.should_show_tab {
                proxy.show_tab();
            }
            Ok(())
        })
        .await?
    }

    fn transition(&self, target: TabState) {
        let session = self.session.id();
        self.state.send_modify(|state| {
            if let Err(err) = state.transition_to(target) {
                warn!(%session, error = %err, "ignored tab transition");
            }
        });
    }
}

async fn forward_pauses(
    mut paused: PausedEventStream,
    ui: Arc<dyn UiDispatcher>,
    gate: Scope,
    session: SessionProxy,
) {
    while let Some(event) = paused.next().await {
        let Some(event) = event else {
            continue;
        };
        let gate = gate.clone();
        let proxy = session.clone();
        let delivered = run_on_ui(ui.as_ref(), move || {
            // Closing the session on the UI context wins over queued pauses.
            if gate.is_cancelled() {
                return false;
            }
            proxy.on_pause(event.paused_by_user, event.top_frame_absent)
        })
        .await;

        match delivered {
            Ok(true) => trace!(session = %session.id(), ?event, "pause delivered"),
            Ok(false) => trace!(session = %session.id(), "pause dropped"),
            Err(err) => {
                warn!(session = %session.id(), error = %err, "UI context gone, stop forwarding pauses");
                return;
            }
        }
    }
    debug!(session = %session.id(), "paused event stream ended");
}
