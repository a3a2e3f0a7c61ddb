//! Client core for the INMS membership API.
//!
//! This crate provides:
//! - [`ApiClient`]: bearer-token attachment with a single refresh-and-retry
//!   on HTTP 401, ending the session when the refresh fails
//! - [`ActivityMonitor`]: local session expiry after a window of inactivity
//! - [`SessionManager`]: login, restore and logout over an explicit FSM
//! - the shared logout primitive, audit events, navigation and layout state
//! - [`ClientRuntime`], which wires the pieces together, and a task-scoped
//!   accessor for it

mod activity;
mod audit;
mod client;
mod error;
mod layout;
mod logout;
mod navigation;
mod runtime;
mod scope;
mod session;
mod session_fsm;
mod transport;

#[cfg(test)]
mod tests;

pub use activity::{
    activity_machine, ActivityEvent, ActivityMachine, ActivityMachineInput, ActivityMachineState,
    ActivityMonitor, ActivityState, MonitorHandle,
};
pub use audit::{AuditEvent, AuditEvents, AuditLog, AuditSink, BroadcastAuditSink, TracingAuditSink};
pub use client::{ApiClient, LOGIN_PATH, PROFILE_PATH, REFRESH_PATH, REVOKE_PATH};
pub use error::{ApiError, ApiResult};
pub use layout::{LayoutState, SidebarState};
pub use logout::{LogoutReason, SessionTerminator};
pub use navigation::{Navigator, RouteState};
pub use runtime::{ClientRuntime, SessionSnapshot};
pub use scope::{auth_context, try_auth_context, with_auth_scope};
pub use session::{SessionManager, SessionStateCallback};
pub use session_fsm::session_machine;
pub use session_fsm::{
    SessionMachine, SessionMachineInput, SessionMachineState, SessionState, SessionStateChanged,
};
pub use transport::{
    ApiRequest, ApiResponse, HttpTransport, Method, MultipartForm, MultipartPart, RequestBody,
    ReqwestTransport,
};
