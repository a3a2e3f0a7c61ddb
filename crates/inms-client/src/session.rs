//! Session lifecycle on top of [`ApiClient`], tracked by an explicit FSM.
//!
//! The FSM tracks in-progress states (signing in, restoring, signing out);
//! the session itself lives in the [`CredentialStore`]. When storage is
//! cleared by another path (refresh failure, inactivity expiry) the manager
//! notices on its next call and moves to `SignedOut`.

use crate::audit::{AuditEvents, AuditLog};
use crate::client::{ApiClient, LOGIN_PATH, PROFILE_PATH, REVOKE_PATH};
use crate::logout::{LogoutReason, SessionTerminator};
use crate::session_fsm::{SessionMachine, SessionMachineInput, SessionState, SessionStateChanged};
use crate::transport::ApiRequest;
use crate::{ApiError, ApiResult};
use inms_storage::{CachedUser, CredentialPair, CredentialStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    username_or_email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    user: CachedUser,
}

/// Callback type for session state change notifications.
pub type SessionStateCallback = Box<dyn Fn(SessionStateChanged) + Send + Sync>;

pub struct SessionManager {
    client: Arc<ApiClient>,
    credentials: Arc<CredentialStore>,
    terminator: Arc<SessionTerminator>,
    audit: AuditLog,
    fsm: Mutex<SessionMachine>,
    state_callback: Mutex<Option<SessionStateCallback>>,
}

impl SessionManager {
    pub fn new(
        client: Arc<ApiClient>,
        credentials: Arc<CredentialStore>,
        terminator: Arc<SessionTerminator>,
        audit: AuditLog,
    ) -> Self {
        Self {
            client,
            credentials,
            terminator,
            audit,
            fsm: Mutex::new(SessionMachine::new()),
            state_callback: Mutex::new(None),
        }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn set_state_callback(&self, callback: SessionStateCallback) {
        *self.state_callback.lock() = Some(callback);
    }

    /// Current state, after reconciling with storage.
    pub fn state(&self) -> SessionState {
        self.reconcile();
        SessionState::from(self.fsm.lock().state())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    fn transition(&self, input: &SessionMachineInput) -> ApiResult<SessionState> {
        let mut fsm = self.fsm.lock();
        let old_state = SessionState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            ApiError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = SessionState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(old_state = ?old_state, new_state = ?new_state, "Session state transition");
            self.notify_state_change(new_state);
        }

        Ok(new_state)
    }

    fn notify_state_change(&self, state: SessionState) {
        let cb = self.state_callback.lock();
        if let Some(callback) = cb.as_ref() {
            let user = self.credentials.cached_user().ok().flatten();
            callback(SessionStateChanged {
                state,
                user_id: user.as_ref().map(|u| u.id.clone()),
                display_name: user.as_ref().map(|u| u.display_name().to_string()),
            });
        }
    }

    /// `SignedIn` with an empty store means another path ended the session.
    fn reconcile(&self) {
        let signed_in = SessionState::from(self.fsm.lock().state()).is_authenticated();
        if signed_in && !self.credentials.has_session().unwrap_or(false) {
            info!("Session cleared externally");
            let _ = self.transition(&SessionMachineInput::SessionEnded);
        }
    }

    /// Authenticate and persist the credential pair with the user record.
    ///
    /// Uses the FSM to track the login operation:
    /// - SignedOut -> SigningIn -> (SignedIn | SignedOut)
    pub async fn login(&self, username_or_email: &str, password: &str) -> ApiResult<CachedUser> {
        self.reconcile();
        self.transition(&SessionMachineInput::LoginAttempt)?;

        match self.try_login(username_or_email, password).await {
            Ok(user) => {
                self.transition(&SessionMachineInput::LoginSuccess)?;
                self.audit
                    .emit(AuditEvents::LOGIN, Some(json!({ "userId": user.id })));
                info!(user_id = %user.id, "Login successful");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.transition(&SessionMachineInput::LoginFailed)?;
                Err(e)
            }
        }
    }

    async fn try_login(&self, username_or_email: &str, password: &str) -> ApiResult<CachedUser> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest {
            username_or_email,
            password,
        })?;
        // A 401 here means bad credentials, not an expired token.
        let response: LoginResponse = self.client.send_raw(&request).await?.json()?;

        self.credentials.set_session(
            &CredentialPair {
                access_token: response.access_token,
                refresh_token: response.refresh_token,
            },
            &response.user,
        )?;
        Ok(response.user)
    }

    /// Restore a persisted session.
    ///
    /// Partial or unreadable storage counts as no session and is wiped; it
    /// never surfaces as an error. Purely local, no network call.
    pub async fn bootstrap(&self) -> ApiResult<Option<CachedUser>> {
        self.reconcile();
        if self.state().is_authenticated() {
            return Ok(self.credentials.cached_user()?);
        }
        self.transition(&SessionMachineInput::Restore)?;

        match self.credentials.load_session() {
            Ok(Some(session)) => {
                if session.refresh_token.is_none() {
                    debug!("Restored session has no refresh token");
                }
                self.transition(&SessionMachineInput::SessionRestored)?;
                info!(user_id = %session.user.id, "Session restored");
                Ok(Some(session.user))
            }
            Ok(None) => {
                self.transition(&SessionMachineInput::NoSession)?;
                debug!("No session to restore");
                Ok(None)
            }
            Err(e) => {
                self.transition(&SessionMachineInput::NoSession)?;
                Err(e.into())
            }
        }
    }

    /// Latest profile from the server, falling back to the cached record.
    ///
    /// Profile failures other than session invalidation degrade to the cache.
    pub async fn current_user(&self) -> ApiResult<Option<CachedUser>> {
        if !self.credentials.has_session()? {
            self.reconcile();
            return Ok(None);
        }

        match self.client.get_json::<CachedUser>(PROFILE_PATH).await {
            Ok(user) => {
                self.credentials.set_cached_user(&user)?;
                Ok(Some(user))
            }
            Err(e) if e.is_session_invalidated() => {
                self.reconcile();
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Profile unavailable, using cached user");
                Ok(self.credentials.cached_user()?)
            }
        }
    }

    /// End the session on request.
    ///
    /// The revoke notification is sent in the background and its outcome
    /// ignored; local state is cleared without waiting for it.
    pub async fn logout(&self) -> ApiResult<()> {
        self.reconcile();
        // Not signed in: clear storage anyway.
        let _ = self.transition(&SessionMachineInput::LogoutRequested);

        match self.revoke_request() {
            Ok(Some(request)) => {
                let client = Arc::clone(&self.client);
                tokio::spawn(async move {
                    if let Err(e) = client.send_raw(&request).await {
                        debug!(error = %e, "Token revocation failed, ignoring");
                    }
                });
            }
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Skipping token revocation"),
        }

        let cleared = self.terminator.terminate(LogoutReason::UserRequested);
        let _ = self.transition(&SessionMachineInput::LogoutComplete);
        cleared?;

        info!("Logged out");
        Ok(())
    }

    /// Revoke notification for the stored refresh token, bearer attached
    /// now so clearing storage cannot race it.
    fn revoke_request(&self) -> ApiResult<Option<ApiRequest>> {
        let Some(refresh_token) = self.credentials.refresh_token()? else {
            return Ok(None);
        };
        let mut request =
            ApiRequest::post(REVOKE_PATH).json(&json!({ "refreshToken": refresh_token }))?;
        self.client.attach(&mut request)?;
        Ok(Some(request))
    }
}
