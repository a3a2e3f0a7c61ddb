//! The logout primitive shared by every session-ending path.

use crate::audit::{AuditEvents, AuditLog};
use crate::navigation::Navigator;
use inms_storage::{CredentialStore, StorageResult};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Why the local session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    UserRequested,
    RefreshFailed,
    InactivityTimeout,
}

impl LogoutReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogoutReason::UserRequested => "user_requested",
            LogoutReason::RefreshFailed => "refresh_failed",
            LogoutReason::InactivityTimeout => "inactivity_timeout",
        }
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clears the credential pair and cached user, records a `logout` audit
/// event and navigates to the landing route.
///
/// Each call bumps a generation counter, so work bound to one session
/// (an activity monitor, say) can tell that session has since ended.
pub struct SessionTerminator {
    credentials: Arc<CredentialStore>,
    navigator: Arc<dyn Navigator>,
    audit: AuditLog,
    landing_route: String,
    generation: watch::Sender<u64>,
}

impl SessionTerminator {
    pub fn new(
        credentials: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
        audit: AuditLog,
        landing_route: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            navigator,
            audit,
            landing_route: landing_route.into(),
            generation: watch::channel(0).0,
        }
    }

    pub fn landing_route(&self) -> &str {
        &self.landing_route
    }

    /// Number of sessions ended so far.
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Notified whenever a session ends.
    pub fn subscribe_generation(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// End the session.
    ///
    /// Navigation and the audit event happen even when clearing storage
    /// fails; the storage error is returned afterwards.
    pub fn terminate(&self, reason: LogoutReason) -> StorageResult<()> {
        let cleared = self.credentials.clear_session();
        if let Err(e) = &cleared {
            warn!(reason = %reason, error = %e, "Failed to clear session storage");
        }

        self.audit
            .emit(AuditEvents::LOGOUT, Some(json!({ "reason": reason.as_str() })));
        self.navigator.navigate(&self.landing_route);
        self.generation.send_modify(|g| *g += 1);

        info!(reason = %reason, route = %self.landing_route, "Session terminated");
        cleared
    }
}
