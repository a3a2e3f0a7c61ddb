//! Client-side inactivity expiry.
//!
//! ```text
//!   ┌────────┐  check: idle >= window  ┌─────────┐
//!   │ Active │ ──────────────────────► │ Expired │
//!   └────────┘ ◄────────────────────── └─────────┘
//!       ▲ │         extend_session
//!       └─┘ activity event / extend_session
//! ```
//!
//! The first `Active -> Expired` check emits `session expired` and runs the
//! logout primitive. Activity events are ignored once expired; only an
//! explicit [`ActivityMonitor::extend_session`] (or a new monitor after a
//! fresh login) brings the session back.
//!
//! A monitor belongs to the session that was live when it was created or
//! last extended. Once that session ends by any path, its checks do nothing,
//! so a stale monitor never ends a later session.

use crate::audit::{AuditEvents, AuditLog};
use crate::logout::{LogoutReason, SessionTerminator};
use parking_lot::Mutex;
use rust_fsm::*;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub activity_machine(Active)

    Active => {
        Activity => Active,
        WindowElapsed => Expired
    },
    Expired => {
        Extend => Active
    }
}

pub use activity_machine::Input as ActivityMachineInput;
pub use activity_machine::State as ActivityMachineState;
pub use activity_machine::StateMachine as ActivityMachine;

/// Input signals that count as user presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityEvent {
    PointerDown,
    PointerMove,
    KeyDown,
    Scroll,
    TouchStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    Active,
    Expired,
}

struct MonitorState {
    machine: ActivityMachine,
    last_activity: Instant,
    /// Terminator generation of the session this monitor watches.
    generation: u64,
}

pub struct ActivityMonitor {
    inner: Mutex<MonitorState>,
    window: Duration,
    audit: AuditLog,
    terminator: Arc<SessionTerminator>,
}

impl ActivityMonitor {
    /// The activity timestamp starts at "now".
    pub fn new(window: Duration, audit: AuditLog, terminator: Arc<SessionTerminator>) -> Self {
        Self {
            inner: Mutex::new(MonitorState {
                machine: ActivityMachine::new(),
                last_activity: Instant::now(),
                generation: terminator.generation(),
            }),
            window,
            audit,
            terminator,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn state(&self) -> ActivityState {
        match self.inner.lock().machine.state() {
            ActivityMachineState::Active => ActivityState::Active,
            ActivityMachineState::Expired => ActivityState::Expired,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.state() == ActivityState::Expired
    }

    pub fn last_activity(&self) -> Instant {
        self.inner.lock().last_activity
    }

    /// Time left before the next check would expire the session.
    pub fn remaining(&self) -> Duration {
        let inner = self.inner.lock();
        if *inner.machine.state() == ActivityMachineState::Expired {
            return Duration::ZERO;
        }
        self.window.saturating_sub(inner.last_activity.elapsed())
    }

    /// Register user input. Returns false (and changes nothing) once expired.
    pub fn record_activity(&self, event: ActivityEvent) -> bool {
        let mut inner = self.inner.lock();
        if inner.machine.consume(&ActivityMachineInput::Activity).is_err() {
            debug!(event = ?event, "Activity ignored, session expired");
            return false;
        }
        inner.last_activity = Instant::now();
        true
    }

    /// Whether the session this monitor watches has not ended yet.
    pub fn is_current(&self) -> bool {
        self.inner.lock().generation == self.terminator.generation()
    }

    /// Explicit extension: resets the timestamp and clears `Expired`.
    /// Rebinds the monitor to whatever session is live now.
    pub fn extend_session(&self) {
        let was_expired = {
            let mut inner = self.inner.lock();
            let was_expired = *inner.machine.state() == ActivityMachineState::Expired;
            if was_expired {
                let _ = inner.machine.consume(&ActivityMachineInput::Extend);
            }
            inner.last_activity = Instant::now();
            inner.generation = self.terminator.generation();
            was_expired
        };

        self.audit.emit(
            AuditEvents::SESSION_EXTENDED,
            Some(json!({ "wasExpired": was_expired })),
        );
    }

    /// Periodic check. Returns true only on the call that expired the session.
    pub fn check(&self) -> bool {
        let idle = {
            let mut inner = self.inner.lock();
            if inner.generation != self.terminator.generation() {
                debug!("Watched session already ended, skipping inactivity check");
                return false;
            }
            let idle = inner.last_activity.elapsed();
            if idle < self.window {
                return false;
            }
            if inner
                .machine
                .consume(&ActivityMachineInput::WindowElapsed)
                .is_err()
            {
                // Already expired.
                return false;
            }
            idle
        };

        info!(
            elapsed_secs = idle.as_secs(),
            window_secs = self.window.as_secs(),
            "Session expired after inactivity"
        );
        self.audit.emit(
            AuditEvents::SESSION_EXPIRED,
            Some(json!({
                "idleSecs": idle.as_secs(),
                "windowSecs": self.window.as_secs(),
            })),
        );
        if let Err(e) = self.terminator.terminate(LogoutReason::InactivityTimeout) {
            warn!(error = %e, "Session storage not fully cleared after inactivity expiry");
        }
        true
    }

    /// Run [`check`](Self::check) every `interval` on the current runtime.
    /// The task stops when the returned handle is dropped.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> MonitorHandle {
        let monitor = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                monitor.check();
            }
        });
        MonitorHandle { task }
    }
}

/// Owns the periodic check task.
pub struct MonitorHandle {
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop the periodic check. Same as dropping the handle.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
