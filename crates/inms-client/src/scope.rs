//! Scoped access to the client runtime.
//!
//! The runtime is reachable only inside [`with_auth_scope`]. Asking for it
//! anywhere else is a programmer error and panics immediately.

use crate::runtime::ClientRuntime;
use std::future::Future;

tokio::task_local! {
    static AUTH_CONTEXT: ClientRuntime;
}

/// Run `fut` with `runtime` available through [`auth_context`].
pub async fn with_auth_scope<F>(runtime: ClientRuntime, fut: F) -> F::Output
where
    F: Future,
{
    AUTH_CONTEXT.scope(runtime, fut).await
}

/// The runtime of the enclosing [`with_auth_scope`].
///
/// # Panics
///
/// Panics when called outside an auth scope.
pub fn auth_context() -> ClientRuntime {
    match try_auth_context() {
        Some(runtime) => runtime,
        None => panic!("auth_context() must be used within with_auth_scope"),
    }
}

pub fn try_auth_context() -> Option<ClientRuntime> {
    AUTH_CONTEXT.try_with(ClientRuntime::clone).ok()
}
