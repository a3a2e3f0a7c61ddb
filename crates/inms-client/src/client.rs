//! Authenticated API client.
//!
//! Every request carries the stored access token. A 401 triggers at most one
//! refresh-and-retry cycle per request:
//!
//! ```text
//! dispatch ──► 2xx ─────────────────────────────► Ok(response)
//!    │
//!    ├──► other non-2xx ─────────────────────────► Err(Http)
//!    │
//!    └──► 401 (not yet retried)
//!           │
//!           ├── no refresh token ────────────────► Err(Http 401)
//!           │
//!           └── POST /auth/refresh
//!                 ├── ok: store access token, resend clone once ─► outcome as-is
//!                 ├── ok, but session ended meanwhile ───────────► Err(SessionInvalidated)
//!                 └── failed: clear session, navigate ───────────► Err(SessionInvalidated)
//! ```
//!
//! Concurrent requests that hit 401 each run their own refresh.

use crate::audit::{AuditEvents, AuditLog};
use crate::logout::{LogoutReason, SessionTerminator};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, MultipartForm, AUTHORIZATION};
use crate::{ApiError, ApiResult};
use inms_storage::CredentialStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const PROFILE_PATH: &str = "/auth/profile";
pub const REVOKE_PATH: &str = "/auth/revoke-token";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Only the access token is read; a rotated refresh token in the response
/// is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<CredentialStore>,
    terminator: Arc<SessionTerminator>,
    audit: AuditLog,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<CredentialStore>,
        terminator: Arc<SessionTerminator>,
        audit: AuditLog,
    ) -> Self {
        Self {
            transport,
            credentials,
            terminator,
            audit,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Set `Authorization: Bearer <access token>` when a token is stored.
    /// Without one the request goes out unauthenticated.
    pub fn attach(&self, request: &mut ApiRequest) -> ApiResult<()> {
        if let Some(token) = self.credentials.access_token()? {
            request.set_header(AUTHORIZATION, format!("Bearer {token}"));
        }
        Ok(())
    }

    /// Send with credentials and 401 recovery.
    pub async fn dispatch(&self, mut request: ApiRequest) -> ApiResult<ApiResponse> {
        self.attach(&mut request)?;
        let response = self.transport.send(&request).await?;

        if response.status == 401 && !request.is_retried() {
            return self.recover(request, response).await;
        }
        response.into_result()
    }

    /// Send exactly as given: no token attached, no 401 recovery.
    /// Used for login, refresh and the revoke notification.
    pub async fn send_raw(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        self.transport.send(request).await?.into_result()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.dispatch(ApiRequest::get(path)).await?.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.dispatch(ApiRequest::post(path).json(body)?)
            .await?
            .json()
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.dispatch(ApiRequest::put(path).json(body)?)
            .await?
            .json()
    }

    pub async fn delete(&self, path: &str) -> ApiResult<ApiResponse> {
        self.dispatch(ApiRequest::delete(path)).await
    }

    /// Multipart POST with the same credential and retry handling.
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, form: MultipartForm) -> ApiResult<T> {
        self.dispatch(ApiRequest::post(path).multipart(form))
            .await?
            .json()
    }

    async fn recover(&self, original: ApiRequest, unauthorized: ApiResponse) -> ApiResult<ApiResponse> {
        let refresh_token = match self.credentials.refresh_token()? {
            Some(token) => token,
            None => {
                debug!(
                    request_id = %original.request_id(),
                    path = %original.path(),
                    "401 without refresh token"
                );
                return unauthorized.into_result();
            }
        };

        info!(
            request_id = %original.request_id(),
            path = %original.path(),
            "Access token rejected, refreshing"
        );

        match self.refresh_access_token(&refresh_token).await {
            Ok(access_token) => {
                // The session may have ended (or been replaced) while the
                // refresh was in flight. Only the session that asked for the
                // token may store it.
                let current = self.credentials.refresh_token()?;
                if current.as_deref() != Some(refresh_token.as_str()) {
                    warn!(
                        request_id = %original.request_id(),
                        "Session ended during token refresh, discarding new token"
                    );
                    return Err(ApiError::SessionInvalidated(Box::new(ApiError::NotLoggedIn)));
                }
                self.credentials.set_access_token(&access_token)?;
                self.audit.emit(AuditEvents::TOKEN_REFRESHED, None);

                let mut retry = original.clone();
                retry.mark_retried();
                self.attach(&mut retry)?;

                debug!(request_id = %retry.request_id(), "Retrying with refreshed token");
                self.transport.send(&retry).await?.into_result()
            }
            Err(refresh_error) => {
                warn!(
                    request_id = %original.request_id(),
                    error = %refresh_error,
                    "Token refresh failed, ending session"
                );
                self.audit.emit(
                    AuditEvents::TOKEN_REFRESH_FAILED,
                    Some(json!({ "error": refresh_error.to_string() })),
                );
                if let Err(e) = self.terminator.terminate(LogoutReason::RefreshFailed) {
                    warn!(error = %e, "Session storage not fully cleared after refresh failure");
                }
                Err(ApiError::SessionInvalidated(Box::new(refresh_error)))
            }
        }
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> ApiResult<String> {
        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest { refresh_token })?;
        let response: RefreshResponse = self.send_raw(&request).await?.json()?;
        Ok(response.access_token)
    }
}
