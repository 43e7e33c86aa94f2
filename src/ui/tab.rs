//! Tab collaborator traits.

use std::sync::{Arc, Mutex};

use crate::remote::SessionTabInfo;
use crate::session::SessionProxy;
use crate::Result;

/// UI container presenting one session.
///
/// Every method is invoked on the UI context.
pub trait DebugTab: Send + 'static {
    /// Make the tab visible.
    fn show(&mut self);

    /// The backend entered a paused state.
    fn on_pause(&mut self, paused_by_user: bool, top_frame_absent: bool);
}

/// Builds tabs from descriptors. Invoked on the UI context.
pub trait TabFactory: Send + Sync + 'static {
    fn create_tab(&self, session: &SessionProxy, info: &SessionTabInfo) -> Result<Box<dyn DebugTab>>;
}

/// Holder of the session's tab once it is initialized.
#[derive(Clone, Default)]
pub struct TabSlot {
    tab: Arc<Mutex<Option<Box<dyn DebugTab>>>>,
}

impl TabSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the freshly built tab. Returns `false` if a tab is already held.
    pub fn install(&self, tab: Box<dyn DebugTab>) -> bool {
        match self.tab.lock() {
            Ok(mut slot) if slot.is_none() => {
                *slot = Some(tab);
                true
            }
            _ => false,
        }
    }

    /// Run `f` against the tab, if one is installed.
    pub fn with_tab<R>(&self, f: impl FnOnce(&mut dyn DebugTab) -> R) -> Option<R> {
        let mut slot = self.tab.lock().ok()?;
        let tab = slot.as_mut()?;
        Some(f(tab.as_mut()))
    }

    pub fn is_installed(&self) -> bool {
        self.tab.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Drop the tab.
    pub fn release(&self) {
        if let Ok(mut slot) = self.tab.lock() {
            slot.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingTab {
        pauses: Arc<Mutex<u32>>,
    }

    impl DebugTab for CountingTab {
        fn show(&mut self) {}

        fn on_pause(&mut self, _paused_by_user: bool, _top_frame_absent: bool) {
            *self.pauses.lock().unwrap() += 1;
        }
    }

    #[test]
    fn test_install_once() {
        let slot = TabSlot::new();
        let pauses = Arc::new(Mutex::new(0));
        assert!(slot.install(Box::new(CountingTab {
            pauses: pauses.clone()
        })));
        assert!(!slot.install(Box::new(CountingTab {
            pauses: pauses.clone()
        })));
        assert!(slot.is_installed());
    }

    #[test]
    fn test_with_tab_and_release() {
        let slot = TabSlot::new();
        assert!(slot.with_tab(|tab| tab.on_pause(true, false)).is_none());

        let pauses = Arc::new(Mutex::new(0));
        slot.install(Box::new(CountingTab {
            pauses: pauses.clone(),
        }));
        slot.with_tab(|tab| tab.on_pause(true, false));
        assert_eq!(*pauses.lock().unwrap(), 1);

        slot.release();
        assert!(!slot.is_installed());
        assert!(slot.with_tab(|tab| tab.on_pause(false, false)).is_none());
    }
}
