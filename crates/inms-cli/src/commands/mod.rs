//! CLI command implementations.
//!
//! Every command runs inside the auth scope set up in `main` and reaches
//! the session through [`inms_client::auth_context`].

mod api;
mod auth;
mod watch;

pub use api::{delete, get, post, upload};
pub use auth::{login, logout, status, whoami};
pub use watch::watch;

use anyhow::anyhow;
use inms_client::ApiError;

/// Turn client errors into messages that tell the user what to do next.
fn describe(err: ApiError) -> anyhow::Error {
    if err.is_session_invalidated() {
        return anyhow!("Session expired. Run 'inms login' to sign in again");
    }
    match err {
        ApiError::NotLoggedIn => anyhow!("Not logged in. Run 'inms login' first"),
        ApiError::Http { status, body } if body.trim().is_empty() => {
            anyhow!("Request failed with HTTP {}", status)
        }
        ApiError::Http { status, body } => anyhow!("Request failed with HTTP {}: {}", status, body),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidated_session_points_to_login() {
        let err = ApiError::SessionInvalidated(Box::new(ApiError::Http {
            status: 401,
            body: String::new(),
        }));
        assert!(describe(err).to_string().contains("inms login"));
    }

    #[test]
    fn test_http_error_includes_body() {
        let err = ApiError::Http {
            status: 403,
            body: "forbidden".to_string(),
        };
        assert_eq!(
            describe(err).to_string(),
            "Request failed with HTTP 403: forbidden"
        );
    }
}
