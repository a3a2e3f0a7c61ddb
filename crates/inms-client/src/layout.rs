//! Shared sidebar state.
//!
//! Views receive a [`LayoutState`] at construction and toggle it directly;
//! anything interested in the flags subscribes to changes.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SidebarState {
    /// Drawer shown (narrow layouts)
    pub open: bool,
    /// Rail mode (wide layouts)
    pub collapsed: bool,
}

#[derive(Debug, Clone)]
pub struct LayoutState {
    tx: Arc<watch::Sender<SidebarState>>,
}

impl LayoutState {
    pub fn new(initial: SidebarState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn sidebar(&self) -> SidebarState {
        *self.tx.borrow()
    }

    pub fn toggle_sidebar(&self) {
        self.tx.send_modify(|state| state.open = !state.open);
    }

    pub fn set_sidebar_open(&self, open: bool) {
        self.tx.send_if_modified(|state| {
            let changed = state.open != open;
            state.open = open;
            changed
        });
    }

    pub fn toggle_collapsed(&self) {
        self.tx.send_modify(|state| state.collapsed = !state.collapsed);
    }

    pub fn subscribe(&self) -> watch::Receiver<SidebarState> {
        self.tx.subscribe()
    }
}

impl Default for LayoutState {
    fn default() -> Self {
        Self::new(SidebarState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_open_only() {
        let layout = LayoutState::default();
        layout.toggle_sidebar();
        assert_eq!(
            layout.sidebar(),
            SidebarState {
                open: true,
                collapsed: false
            }
        );
        layout.toggle_collapsed();
        layout.toggle_sidebar();
        assert_eq!(
            layout.sidebar(),
            SidebarState {
                open: false,
                collapsed: true
            }
        );
    }

    #[test]
    fn test_clones_share_state() {
        let layout = LayoutState::default();
        let injected = layout.clone();
        injected.set_sidebar_open(true);
        assert!(layout.sidebar().open);
    }

    #[tokio::test]
    async fn test_subscribers_are_notified() {
        let layout = LayoutState::default();
        let mut rx = layout.subscribe();

        layout.toggle_sidebar();
        rx.changed().await.unwrap();
        assert!(rx.borrow().open);
    }

    #[test]
    fn test_setting_same_value_does_not_notify() {
        let layout = LayoutState::default();
        let rx = layout.subscribe();

        layout.set_sidebar_open(false);
        assert!(!rx.has_changed().unwrap());
    }
}
