//! Session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                ┌─────────────────┐
//!                │    SignedOut    │ (initial)
//!                └──┬───────────┬──┘
//!      LoginAttempt │           │ Restore
//!                   ▼           ▼
//!        ┌────────────┐   ┌────────────┐
//!        │ SigningIn  │   │ Restoring  │── NoSession ──► SignedOut
//!        └─────┬──────┘   └─────┬──────┘
//!  LoginSuccess│   LoginFailed  │ SessionRestored
//!              │   ► SignedOut  │
//!              ▼                ▼
//!        ┌─────────────────────────┐
//!        │        SignedIn         │── SessionEnded ──► SignedOut
//!        └────────────┬────────────┘   (refresh failure, inactivity)
//!                     │ LogoutRequested
//!                     ▼
//!               ┌────────────┐
//!               │ SigningOut │── LogoutComplete ──► SignedOut
//!               └────────────┘
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(SignedOut)

    SignedOut => {
        LoginAttempt => SigningIn,
        Restore => Restoring
    },
    Restoring => {
        SessionRestored => SignedIn,
        NoSession => SignedOut
    },
    SigningIn => {
        LoginSuccess => SignedIn,
        LoginFailed => SignedOut
    },
    SignedIn => {
        LogoutRequested => SigningOut,
        // Session cleared behind the manager's back
        SessionEnded => SignedOut
    },
    SigningOut => {
        LogoutComplete => SignedOut
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Public view of the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    SignedOut,
    SigningIn,
    Restoring,
    SignedIn,
    SigningOut,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::SignedIn)
    }

    /// Returns true while an operation is in progress.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionState::SigningIn | SessionState::Restoring | SessionState::SigningOut
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::SignedOut => "signed_out",
            SessionState::SigningIn => "signing_in",
            SessionState::Restoring => "restoring",
            SessionState::SignedIn => "signed_in",
            SessionState::SigningOut => "signing_out",
        }
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::SignedOut => SessionState::SignedOut,
            SessionMachineState::SigningIn => SessionState::SigningIn,
            SessionMachineState::Restoring => SessionState::Restoring,
            SessionMachineState::SignedIn => SessionState::SignedIn,
            SessionMachineState::SigningOut => SessionState::SigningOut,
        }
    }
}

/// Payload passed to the state-change callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStateChanged {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}
