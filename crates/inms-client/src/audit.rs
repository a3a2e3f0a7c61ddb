//! Security audit events.
//!
//! Every security-relevant transition (login, logout, expiry, refresh)
//! produces an [`AuditEvent`]. Events fan out to every registered
//! [`AuditSink`]; nothing here sends them to the server.

use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Audit event names.
pub struct AuditEvents;

impl AuditEvents {
    pub const LOGIN: &'static str = "login";
    pub const LOGOUT: &'static str = "logout";
    pub const SESSION_EXPIRED: &'static str = "session expired";
    pub const SESSION_EXTENDED: &'static str = "session extended";
    pub const TOKEN_REFRESHED: &'static str = "token refreshed";
    pub const TOKEN_REFRESH_FAILED: &'static str = "token refresh failed";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// ISO-8601, UTC
    pub timestamp: String,
    pub client_context: String,
}

impl AuditEvent {
    pub fn new(event_name: impl Into<String>, client_context: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            details: None,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            client_context: client_context.into(),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Receives audit events. Implementations must not block.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Writes each event as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        let details = event
            .details
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();
        info!(
            target: "inms::audit",
            event_name = %event.event_name,
            client_context = %event.client_context,
            timestamp = %event.timestamp,
            details = %details,
            "Audit event"
        );
    }
}

/// Republishes events on a broadcast channel for external telemetry.
#[derive(Debug, Clone)]
pub struct BroadcastAuditSink {
    tx: broadcast::Sender<AuditEvent>,
}

impl BroadcastAuditSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.tx.subscribe()
    }
}

impl AuditSink for BroadcastAuditSink {
    fn record(&self, event: &AuditEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event.clone());
    }
}

/// Shared emission point. Cheap to clone; clones share their sinks.
#[derive(Clone)]
pub struct AuditLog {
    client_context: Arc<str>,
    sinks: Arc<RwLock<Vec<Arc<dyn AuditSink>>>>,
}

impl AuditLog {
    /// An audit log with no sinks. Events are dropped until one is added.
    pub fn new(client_context: impl Into<String>) -> Self {
        Self {
            client_context: Arc::from(client_context.into()),
            sinks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn with_sink(self, sink: Arc<dyn AuditSink>) -> Self {
        self.add_sink(sink);
        self
    }

    pub fn add_sink(&self, sink: Arc<dyn AuditSink>) {
        self.sinks.write().push(sink);
    }

    pub fn client_context(&self) -> &str {
        &self.client_context
    }

    pub fn emit(&self, event_name: &str, details: Option<Value>) {
        let mut event = AuditEvent::new(event_name, self.client_context.as_ref());
        event.details = details;

        let sinks = self.sinks.read().clone();
        for sink in sinks {
            sink.record(&event);
        }
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("client_context", &self.client_context)
            .field("sinks", &self.sinks.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct Collect(Mutex<Vec<AuditEvent>>);

    impl AuditSink for Collect {
        fn record(&self, event: &AuditEvent) {
            self.0.lock().push(event.clone());
        }
    }

    #[test]
    fn test_event_serializes_in_camel_case() {
        let event = AuditEvent::new(AuditEvents::SESSION_EXPIRED, "inms-web")
            .with_details(json!({"idleSecs": 1800}));
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["eventName"], "session expired");
        assert_eq!(value["clientContext"], "inms-web");
        assert_eq!(value["details"]["idleSecs"], 1800);
        assert!(chrono::DateTime::parse_from_rfc3339(value["timestamp"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_details_omitted_when_absent() {
        let value = serde_json::to_value(AuditEvent::new("login", "inms-web")).unwrap();
        assert!(value.get("details").is_none());
    }

    #[test]
    fn test_emit_reaches_every_sink_including_clones() {
        let first = Arc::new(Collect::default());
        let second = Arc::new(Collect::default());
        let log = AuditLog::new("inms-web").with_sink(first.clone());
        let clone = log.clone();
        clone.add_sink(second.clone());

        log.emit(AuditEvents::LOGIN, None);

        assert_eq!(first.0.lock().len(), 1);
        assert_eq!(second.0.lock().len(), 1);
        assert_eq!(first.0.lock()[0].client_context, "inms-web");
    }

    #[tokio::test]
    async fn test_broadcast_sink_delivers_to_subscribers() {
        let sink = BroadcastAuditSink::new(8);
        let mut rx = sink.subscribe();
        let log = AuditLog::new("inms-cli").with_sink(Arc::new(sink));

        log.emit(AuditEvents::TOKEN_REFRESHED, None);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_name, "token refreshed");
    }

    #[test]
    fn test_broadcast_sink_without_subscribers_is_silent() {
        let log = AuditLog::new("inms-cli").with_sink(Arc::new(BroadcastAuditSink::new(1)));
        log.emit(AuditEvents::LOGOUT, None);
    }
}
