//! Typed access to the persisted session: credential pair plus cached user.

use crate::{DurableStorage, StorageError, StorageKeys, StorageResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Access and refresh token issued together at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Last-known profile of the signed-in user.
///
/// Fields the client does not interpret are kept in `extra` so a round
/// trip through storage does not lose server data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedUser {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CachedUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            email: None,
            full_name: None,
            roles: Vec::new(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Best label for display: full name, then username, then email, then id.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.username.as_deref())
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// A complete session restored from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub access_token: String,
    /// May be absent; the client then cannot recover from a 401.
    pub refresh_token: Option<String>,
    pub user: CachedUser,
}

/// High-level API over the three session keys.
///
/// The keys are written one at a time; nothing makes the group atomic.
/// [`CredentialStore::load_session`] therefore treats any partial or
/// unreadable combination as "no session" and wipes it.
pub struct CredentialStore {
    storage: Box<dyn DurableStorage>,
}

impl CredentialStore {
    /// Create a credential store over the given storage backend
    pub fn new(storage: Box<dyn DurableStorage>) -> Self {
        Self { storage }
    }

    /// Persist a fresh login: both tokens and the user record.
    pub fn set_session(&self, credentials: &CredentialPair, user: &CachedUser) -> StorageResult<()> {
        self.storage
            .set(StorageKeys::ACCESS_TOKEN, &credentials.access_token)?;
        self.storage
            .set(StorageKeys::REFRESH_TOKEN, &credentials.refresh_token)?;
        self.set_cached_user(user)?;
        debug!(user_id = %user.id, "Session persisted");
        Ok(())
    }

    /// Replace the access token after a refresh. The refresh token is left alone.
    pub fn set_access_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::ACCESS_TOKEN, token)
    }

    pub fn access_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::REFRESH_TOKEN)
    }

    /// Presence of an access token is what the rest of the app reads as
    /// "a session is active".
    pub fn has_session(&self) -> StorageResult<bool> {
        self.storage.has(StorageKeys::ACCESS_TOKEN)
    }

    pub fn set_cached_user(&self, user: &CachedUser) -> StorageResult<()> {
        let json =
            serde_json::to_string(user).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(StorageKeys::USER, &json)
    }

    pub fn cached_user(&self) -> StorageResult<Option<CachedUser>> {
        match self.storage.get(StorageKeys::USER)? {
            Some(json) => {
                let user: CachedUser = serde_json::from_str(&json)
                    .map_err(|e| StorageError::Encoding(e.to_string()))?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Restore the session, tolerating partial or corrupt state.
    ///
    /// Returns `Ok(None)` and clears every session key when the access token
    /// and user record are not both present and readable.
    pub fn load_session(&self) -> StorageResult<Option<StoredSession>> {
        let access_token = self.access_token()?;
        let refresh_token = self.refresh_token()?;
        let user_json = self.storage.get(StorageKeys::USER)?;

        match (access_token, user_json) {
            (None, None) => {
                if refresh_token.is_some() {
                    warn!("Orphaned refresh token found without session, clearing");
                    self.clear_session()?;
                }
                Ok(None)
            }
            (Some(access_token), Some(user_json)) => {
                match serde_json::from_str::<CachedUser>(&user_json) {
                    Ok(user) => Ok(Some(StoredSession {
                        access_token,
                        refresh_token,
                        user,
                    })),
                    Err(e) => {
                        warn!(error = %e, "Cached user record is unreadable, clearing session");
                        self.clear_session()?;
                        Ok(None)
                    }
                }
            }
            (has_token, has_user) => {
                warn!(
                    has_access_token = has_token.is_some(),
                    has_user = has_user.is_some(),
                    "Partial session found in storage, clearing"
                );
                self.clear_session()?;
                Ok(None)
            }
        }
    }

    /// Remove the access token, refresh token and cached user.
    ///
    /// Every key is attempted even if an earlier delete fails; the first
    /// error is returned.
    pub fn clear_session(&self) -> StorageResult<()> {
        let mut first_error = None;
        for key in StorageKeys::SESSION_KEYS {
            if let Err(e) = self.storage.delete(key) {
                warn!(key = %key, error = %e, "Failed to delete session key");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                debug!("Session cleared");
                Ok(())
            }
        }
    }
}
