//! Notification-sink boundary. The engine emits typed events; the host
//! decides how to render them (toast, tray, frontend bridge). Emission is
//! fire-and-forget and never awaited on for acknowledgment.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::models::AttendanceSession;
use crate::presenter::ElapsedSnapshot;
use crate::session::SessionSnapshot;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    StateChanged { snapshot: SessionSnapshot },
    Tick { elapsed: ElapsedSnapshot },
    SessionCompleted { session: AttendanceSession },
    SessionCancelled { reason: String },
    ConsentRequested,
    Notice { level: NoticeLevel, message: String },
}

impl SessionEvent {
    /// Stable event name for hosts that bridge onto a (name, payload) bus.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::StateChanged { .. } => "session-state-changed",
            SessionEvent::Tick { .. } => "session-tick",
            SessionEvent::SessionCompleted { .. } => "session-completed",
            SessionEvent::SessionCancelled { .. } => "session-cancelled",
            SessionEvent::ConsentRequested => "monitoring-consent-requested",
            SessionEvent::Notice { .. } => "notice",
        }
    }

    pub fn payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

/// Discards everything. Useful for headless embeddings.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SessionEvent) {}
}

/// Buffers events in memory so a host (or test) can drain them later.
#[derive(Default)]
pub struct BufferSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<SessionEvent> {
        let mut guard = self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *guard)
    }

    pub fn snapshot(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl EventSink for BufferSink {
    fn emit(&self, event: SessionEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
