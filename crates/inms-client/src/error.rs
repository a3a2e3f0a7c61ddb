//! Client error types.

use std::time::Duration;
use thiserror::Error;

/// Error type for API calls and session operations.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Server unreachable, connection reset, TLS failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// No response within the request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response, passed through unchanged
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Token refresh failed; local session has been cleared.
    /// Wraps the refresh failure, not the original 401.
    #[error("Session invalidated, please log in again: {0}")]
    SessionInvalidated(#[source] Box<ApiError>),

    /// No session in storage
    #[error("Not logged in")]
    NotLoggedIn,

    /// Request could not be encoded before sending
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid transition in the session state machine
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] inms_storage::StorageError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] inms_config::CoreError),
}

impl ApiError {
    /// Network failure or timeout. These never trigger the refresh protocol.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Timeout(_))
    }

    /// The caller should ask the user to log in again.
    pub fn is_session_invalidated(&self) -> bool {
        matches!(self, ApiError::SessionInvalidated(_))
    }

    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kinds() {
        assert!(ApiError::Transport("connection refused".into()).is_transport());
        assert!(ApiError::Timeout(Duration::from_secs(10)).is_transport());
        assert!(!ApiError::Http {
            status: 503,
            body: String::new()
        }
        .is_transport());
    }

    #[test]
    fn test_status_only_for_http_errors() {
        let err = ApiError::Http {
            status: 422,
            body: "{\"error\":\"invalid\"}".into(),
        };
        assert_eq!(err.status(), Some(422));
        assert_eq!(ApiError::NotLoggedIn.status(), None);
    }

    #[test]
    fn test_session_invalidated_wraps_refresh_failure() {
        let err = ApiError::SessionInvalidated(Box::new(ApiError::Http {
            status: 400,
            body: "refresh token expired".into(),
        }));
        assert!(err.is_session_invalidated());
        assert!(!err.is_unauthorized());
        assert_eq!(err.status(), None);

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "HTTP 400: refresh token expired");
    }

    #[test]
    fn test_unauthorized_and_not_found() {
        let unauthorized = ApiError::Http {
            status: 401,
            body: String::new(),
        };
        assert!(unauthorized.is_unauthorized());
        assert!(!unauthorized.is_not_found());

        let not_found = ApiError::Http {
            status: 404,
            body: String::new(),
        };
        assert!(not_found.is_not_found());
    }
}
