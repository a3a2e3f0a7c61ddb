//! Logout triggers.
//!
//! Manual logout, refresh failure and inactivity expiry all go through the
//! same primitive; after each one no session key remains in storage.

use super::harness::{
    json_body, RecordingNavigator, Reply, ScriptedTransport, TestHarness, LANDING,
};
use crate::activity::ActivityMonitor;
use crate::audit::{AuditEvents, AuditLog};
use crate::client::{ApiClient, REFRESH_PATH, REVOKE_PATH};
use crate::logout::SessionTerminator;
use crate::session::SessionManager;
use crate::session_fsm::SessionState;
use inms_storage::{CredentialStore, DurableStorage, StorageError, StorageKeys, StorageResult};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Storage whose reads fail while deletes still work, like a session file
/// that exists but cannot be parsed by the backend.
#[derive(Default)]
struct UnreadableStorage {
    deleted: Mutex<Vec<String>>,
}

impl DurableStorage for UnreadableStorage {
    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Ok(())
    }

    fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Platform("session file unreadable".to_string()))
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(true)
    }
}

#[tokio::test]
async fn manual_logout_clears_storage_and_revokes_in_background() {
    let h = TestHarness::new();
    h.seed_session("A1", "R1");
    h.session.bootstrap().await.unwrap();
    h.transport.on(REVOKE_PATH, Reply::ok(json!({})));

    h.session.logout().await.unwrap();

    assert!(h.remaining_keys().is_empty());
    assert_eq!(h.navigator.navigations(), vec![LANDING.to_string()]);
    assert_eq!(h.session.state(), SessionState::SignedOut);

    h.settle().await;
    let revokes = h.transport.sent_to(REVOKE_PATH);
    assert_eq!(revokes.len(), 1);
    assert_eq!(json_body(&revokes[0]), json!({"refreshToken": "R1"}));
    assert_eq!(revokes[0].bearer_token(), Some("A1"));

    let logout = h
        .audit_sink
        .events()
        .into_iter()
        .find(|e| e.event_name == AuditEvents::LOGOUT)
        .unwrap();
    assert_eq!(logout.details.unwrap()["reason"], "user_requested");
}

#[tokio::test]
async fn failed_revoke_is_ignored() {
    let h = TestHarness::new();
    h.seed_session("A1", "R1");
    h.session.bootstrap().await.unwrap();
    h.transport.on(REVOKE_PATH, Reply::Status(500, "down".into()));

    h.session.logout().await.unwrap();
    h.settle().await;

    assert!(h.remaining_keys().is_empty());
    assert_eq!(h.transport.count(REVOKE_PATH), 1);
}

#[tokio::test]
async fn revoke_401_does_not_trigger_refresh() {
    let h = TestHarness::new();
    h.seed_session("A1", "R1");
    h.transport.on(REVOKE_PATH, Reply::unauthorized());

    h.session.logout().await.unwrap();
    h.settle().await;

    assert_eq!(h.transport.count(REFRESH_PATH), 0);
    assert_eq!(h.navigator.count(), 1);
}

#[tokio::test]
async fn logout_without_session_still_navigates() {
    let h = TestHarness::new();

    h.session.logout().await.unwrap();
    h.settle().await;

    assert_eq!(h.transport.count(REVOKE_PATH), 0);
    assert_eq!(h.navigator.count(), 1);
}

#[tokio::test]
async fn refresh_failure_logout_clears_storage() {
    let h = TestHarness::new();
    h.seed_session("A1", "R1");
    h.session.bootstrap().await.unwrap();
    h.transport.on("/members", Reply::unauthorized());
    h.transport.on(REFRESH_PATH, Reply::Status(401, "revoked".into()));

    let err = h.client.get_json::<Value>("/members").await.unwrap_err();

    assert!(err.is_session_invalidated());
    assert!(h.remaining_keys().is_empty());
    assert_eq!(h.session.state(), SessionState::SignedOut);
}

#[tokio::test(start_paused = true)]
async fn inactivity_logout_clears_storage() {
    let h = TestHarness::new();
    h.seed_session("A1", "R1");
    h.session.bootstrap().await.unwrap();
    let monitor = ActivityMonitor::new(
        Duration::from_secs(30 * 60),
        h.audit.clone(),
        h.terminator.clone(),
    );

    tokio::time::advance(Duration::from_secs(30 * 60)).await;
    assert!(monitor.check());

    assert!(h.remaining_keys().is_empty());
    assert_eq!(h.session.state(), SessionState::SignedOut);
    let logout = h
        .audit_sink
        .events()
        .into_iter()
        .find(|e| e.event_name == AuditEvents::LOGOUT)
        .unwrap();
    assert_eq!(logout.details.unwrap()["reason"], "inactivity_timeout");
}

#[tokio::test]
async fn unreadable_storage_still_logs_out() {
    let backing = Arc::new(UnreadableStorage::default());
    let credentials = Arc::new(CredentialStore::new(Box::new(backing.clone())));
    let transport = Arc::new(ScriptedTransport::new());
    let navigator = Arc::new(RecordingNavigator::default());
    let audit = AuditLog::new("inms-test");
    let terminator = Arc::new(SessionTerminator::new(
        credentials.clone(),
        navigator.clone(),
        audit.clone(),
        LANDING,
    ));
    let client = Arc::new(ApiClient::new(
        transport.clone(),
        credentials.clone(),
        terminator.clone(),
        audit.clone(),
    ));
    let session = SessionManager::new(client, credentials, terminator, audit);

    session.logout().await.unwrap();
    tokio::task::yield_now().await;

    assert_eq!(navigator.navigations(), vec![LANDING.to_string()]);
    let deleted = backing.deleted.lock().unwrap().clone();
    for key in StorageKeys::SESSION_KEYS {
        assert!(deleted.iter().any(|k| k == key), "{key} not cleared");
    }
    assert_eq!(transport.count(REVOKE_PATH), 0);
}
