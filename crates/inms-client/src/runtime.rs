//! Client runtime: wires storage, transport, audit and navigation into one
//! shared authority for login, logout, status and API calls.

use crate::activity::{ActivityMonitor, MonitorHandle};
use crate::audit::{AuditLog, TracingAuditSink};
use crate::client::ApiClient;
use crate::layout::LayoutState;
use crate::logout::SessionTerminator;
use crate::navigation::{Navigator, RouteState};
use crate::session::SessionManager;
use crate::session_fsm::SessionState;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::ApiResult;
use inms_config::Config;
use inms_storage::{CachedUser, CredentialStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Snapshot of the session for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<CachedUser>,
    pub has_refresh_token: bool,
    pub route: String,
}

#[derive(Clone)]
pub struct ClientRuntime {
    session: Arc<SessionManager>,
    client: Arc<ApiClient>,
    credentials: Arc<CredentialStore>,
    terminator: Arc<SessionTerminator>,
    audit: AuditLog,
    routes: RouteState,
    layout: LayoutState,
    inactivity_timeout: Duration,
    check_interval: Duration,
}

impl ClientRuntime {
    /// Build against the configured API with the `reqwest` transport.
    /// A tracing audit sink is installed; add more through [`Self::audit`].
    pub fn from_config(config: &Config, credentials: CredentialStore) -> ApiResult<Self> {
        let transport = ReqwestTransport::new(config.api_base_url()?, config.request_timeout())?;
        let audit = AuditLog::new(config.client_context.clone()).with_sink(Arc::new(TracingAuditSink));
        Ok(Self::with_transport(
            config,
            Arc::new(transport),
            Arc::new(credentials),
            audit,
        ))
    }

    /// Build with an explicit transport and audit log.
    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<CredentialStore>,
        audit: AuditLog,
    ) -> Self {
        let routes = RouteState::new(config.landing_route.clone());
        let terminator = Arc::new(SessionTerminator::new(
            Arc::clone(&credentials),
            Arc::new(routes.clone()) as Arc<dyn Navigator>,
            audit.clone(),
            config.landing_route.clone(),
        ));
        let client = Arc::new(ApiClient::new(
            transport,
            Arc::clone(&credentials),
            Arc::clone(&terminator),
            audit.clone(),
        ));
        let session = Arc::new(SessionManager::new(
            Arc::clone(&client),
            Arc::clone(&credentials),
            Arc::clone(&terminator),
            audit.clone(),
        ));

        Self {
            session,
            client,
            credentials,
            terminator,
            audit,
            routes,
            layout: LayoutState::default(),
            inactivity_timeout: config.inactivity_timeout(),
            check_interval: config.activity_check_interval(),
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn routes(&self) -> &RouteState {
        &self.routes
    }

    pub fn layout(&self) -> &LayoutState {
        &self.layout
    }

    pub fn status(&self) -> ApiResult<SessionSnapshot> {
        let state = self.session.state();
        Ok(SessionSnapshot {
            authenticated: state.is_authenticated(),
            state,
            user: self.credentials.cached_user()?,
            has_refresh_token: self.credentials.refresh_token()?.is_some(),
            route: self.routes.current_route(),
        })
    }

    /// Fresh monitor for a newly signed-in session, checked on the
    /// configured interval until the handle is dropped.
    pub fn start_activity_monitor(&self) -> (Arc<ActivityMonitor>, MonitorHandle) {
        let monitor = Arc::new(ActivityMonitor::new(
            self.inactivity_timeout,
            self.audit.clone(),
            Arc::clone(&self.terminator),
        ));
        let handle = monitor.spawn(self.check_interval);
        debug!(
            window_secs = self.inactivity_timeout.as_secs(),
            interval_secs = self.check_interval.as_secs(),
            "Activity monitor started"
        );
        (monitor, handle)
    }
}
