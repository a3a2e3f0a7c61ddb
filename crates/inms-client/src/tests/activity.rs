//! Inactivity expiry on a paused clock.

use super::harness::{TestHarness, LANDING};
use crate::activity::{ActivityEvent, ActivityMonitor, ActivityState};
use crate::audit::AuditEvents;
use std::sync::Arc;
use std::time::Duration;

const WINDOW: Duration = Duration::from_secs(30 * 60);
const MINUTE: Duration = Duration::from_secs(60);

fn monitor(h: &TestHarness) -> Arc<ActivityMonitor> {
    Arc::new(ActivityMonitor::new(
        WINDOW,
        h.audit.clone(),
        h.terminator.clone(),
    ))
}

// =============================================================================
// Expiry
// =============================================================================

#[tokio::test(start_paused = true)]
async fn stays_active_until_window_elapses() {
    let h = TestHarness::new();
    let monitor = monitor(&h);

    tokio::time::advance(WINDOW - Duration::from_secs(1)).await;

    assert!(!monitor.check());
    assert_eq!(monitor.state(), ActivityState::Active);
    assert_eq!(monitor.remaining(), Duration::from_secs(1));
    assert_eq!(h.navigator.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn expires_and_logs_out_exactly_once() {
    let h = TestHarness::new();
    h.seed_session("A1", "R1");
    let monitor = monitor(&h);

    tokio::time::advance(WINDOW).await;
    assert!(monitor.check());
    for _ in 0..5 {
        tokio::time::advance(MINUTE).await;
        assert!(!monitor.check());
    }

    assert_eq!(monitor.state(), ActivityState::Expired);
    assert_eq!(h.navigator.navigations(), vec![LANDING.to_string()]);
    assert_eq!(h.audit_sink.count(AuditEvents::SESSION_EXPIRED), 1);
    assert_eq!(h.audit_sink.count(AuditEvents::LOGOUT), 1);
    assert!(h.remaining_keys().is_empty());

    // The expiry event precedes the logout it causes.
    assert_eq!(
        h.audit_sink.names(),
        vec![AuditEvents::SESSION_EXPIRED, AuditEvents::LOGOUT]
    );
}

#[tokio::test(start_paused = true)]
async fn expiry_event_carries_context_and_idle_time() {
    let h = TestHarness::new();
    let monitor = monitor(&h);

    tokio::time::advance(WINDOW + MINUTE).await;
    monitor.check();

    let event = &h.audit_sink.events()[0];
    assert_eq!(event.client_context, "inms-test");
    let details = event.details.as_ref().unwrap();
    assert_eq!(details["idleSecs"], 31 * 60);
    assert_eq!(details["windowSecs"], 30 * 60);
}

#[tokio::test(start_paused = true)]
async fn activity_pushes_expiry_back() {
    let h = TestHarness::new();
    let monitor = monitor(&h);

    tokio::time::advance(20 * MINUTE).await;
    assert!(monitor.record_activity(ActivityEvent::KeyDown));
    tokio::time::advance(20 * MINUTE).await;
    assert!(!monitor.check());

    tokio::time::advance(10 * MINUTE).await;
    assert!(monitor.check());
}

// =============================================================================
// After expiry
// =============================================================================

#[tokio::test(start_paused = true)]
async fn activity_after_expiry_is_ignored() {
    let h = TestHarness::new();
    let monitor = monitor(&h);
    tokio::time::advance(WINDOW).await;
    monitor.check();
    let expired_at = monitor.last_activity();

    tokio::time::advance(MINUTE).await;
    for event in [
        ActivityEvent::PointerDown,
        ActivityEvent::PointerMove,
        ActivityEvent::KeyDown,
        ActivityEvent::Scroll,
        ActivityEvent::TouchStart,
    ] {
        assert!(!monitor.record_activity(event));
    }

    assert_eq!(monitor.state(), ActivityState::Expired);
    assert_eq!(monitor.last_activity(), expired_at);
    assert_eq!(monitor.remaining(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn explicit_extension_revives_expired_session() {
    let h = TestHarness::new();
    let monitor = monitor(&h);
    tokio::time::advance(WINDOW).await;
    monitor.check();

    monitor.extend_session();

    assert_eq!(monitor.state(), ActivityState::Active);
    assert_eq!(monitor.remaining(), WINDOW);
    assert_eq!(h.audit_sink.count(AuditEvents::SESSION_EXTENDED), 1);

    tokio::time::advance(MINUTE).await;
    assert!(!monitor.check());
    assert!(monitor.record_activity(ActivityEvent::Scroll));

    // A second expiry logs out again.
    tokio::time::advance(WINDOW).await;
    assert!(monitor.check());
    assert_eq!(h.navigator.count(), 2);
}

// =============================================================================
// Stale monitors
// =============================================================================

#[tokio::test(start_paused = true)]
async fn monitor_from_ended_session_leaves_next_session_alone() {
    let h = TestHarness::new();
    h.seed_session("A1", "R1");
    let monitor = monitor(&h);

    tokio::time::advance(10 * MINUTE).await;
    h.session.logout().await.unwrap();
    h.seed_session("A2", "R2");
    assert!(!monitor.is_current());

    tokio::time::advance(WINDOW).await;
    assert!(!monitor.check());

    assert_eq!(h.stored(inms_storage::StorageKeys::ACCESS_TOKEN).as_deref(), Some("A2"));
    assert_eq!(h.navigator.count(), 1);
    assert_eq!(h.audit_sink.count(AuditEvents::SESSION_EXPIRED), 0);
    assert_eq!(h.audit_sink.count(AuditEvents::LOGOUT), 1);
}

#[tokio::test(start_paused = true)]
async fn extension_binds_monitor_to_live_session() {
    let h = TestHarness::new();
    let monitor = monitor(&h);
    h.terminator
        .terminate(crate::logout::LogoutReason::RefreshFailed)
        .unwrap();
    assert!(!monitor.is_current());

    monitor.extend_session();
    assert!(monitor.is_current());

    tokio::time::advance(WINDOW).await;
    assert!(monitor.check());
    assert_eq!(h.navigator.count(), 2);
}

// =============================================================================
// Periodic task
// =============================================================================

#[tokio::test(start_paused = true)]
async fn spawned_monitor_expires_on_schedule() {
    let h = TestHarness::new();
    h.seed_session("A1", "R1");
    let monitor = monitor(&h);
    let _handle = monitor.spawn(MINUTE);

    tokio::time::sleep(29 * MINUTE).await;
    assert_eq!(monitor.state(), ActivityState::Active);

    tokio::time::sleep(2 * MINUTE).await;
    assert_eq!(monitor.state(), ActivityState::Expired);
    assert_eq!(h.navigator.count(), 1);

    tokio::time::sleep(10 * MINUTE).await;
    assert_eq!(h.navigator.count(), 1);
    assert_eq!(h.audit_sink.count(AuditEvents::SESSION_EXPIRED), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_stops_checks() {
    let h = TestHarness::new();
    let monitor = monitor(&h);
    let handle = monitor.spawn(MINUTE);

    drop(handle);
    tokio::time::sleep(WINDOW + 5 * MINUTE).await;

    assert_eq!(monitor.state(), ActivityState::Active);
    assert_eq!(h.navigator.count(), 0);
}
