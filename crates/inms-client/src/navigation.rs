//! Route navigation seam.
//!
//! The client never talks to a router directly. Forced redirects (logout,
//! refresh failure, inactivity) go through a [`Navigator`].

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);

    fn current_route(&self) -> String;
}

/// Observable current route.
#[derive(Debug, Clone)]
pub struct RouteState {
    tx: Arc<watch::Sender<String>>,
}

impl RouteState {
    pub fn new(initial: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(initial.into());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for RouteState {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for RouteState {
    fn navigate(&self, route: &str) {
        let previous = self.tx.send_replace(route.to_string());
        debug!(from = %previous, route = %route, "Navigated");
    }

    fn current_route(&self) -> String {
        self.tx.borrow().clone()
    }
}
