use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{AttendanceSession, BreakEntry};

/// NoSession -> (PendingConsent ->) Working <-> OnBreak; completion and the
/// revocation edge both return to Idle.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Idle,
    /// Clocked in, waiting on the monitoring consent grant.
    PendingConsent,
    Working,
    OnBreak,
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Idle
    }
}

/// In-memory mirror of the active session and its break ledger. The store
/// stays the system of record; this is the working copy the controller and
/// the display tick read.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub session: Option<AttendanceSession>,
    pub breaks: Vec<BreakEntry>,
    /// Per-user policy: monitoring is a clock-in precondition.
    pub monitoring_required: bool,
    /// Whether a capture cycle is currently bound to a granted source.
    pub monitoring_active: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, session: AttendanceSession, monitoring_required: bool) {
        *self = Self {
            phase: if monitoring_required {
                SessionPhase::PendingConsent
            } else {
                SessionPhase::Working
            },
            session: Some(session),
            breaks: Vec::new(),
            monitoring_required,
            monitoring_active: false,
        };
    }

    /// Rebuilds state from store rows after a client restart. Capture never
    /// survives a restart, so monitoring always starts inactive.
    pub fn restore(
        &mut self,
        session: AttendanceSession,
        breaks: Vec<BreakEntry>,
        monitoring_required: bool,
    ) {
        let on_break = breaks.iter().any(|entry| entry.is_open());
        *self = Self {
            phase: if on_break {
                SessionPhase::OnBreak
            } else {
                SessionPhase::Working
            },
            session: Some(session),
            breaks,
            monitoring_required,
            monitoring_active: false,
        };
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.id.as_str())
    }

    pub fn open_break(&self) -> Option<&BreakEntry> {
        self.breaks.iter().find(|entry| entry.is_open())
    }

    pub fn start_break(&mut self, entry: BreakEntry) {
        self.breaks.push(entry);
        self.phase = SessionPhase::OnBreak;
    }

    /// Closes the open break and returns it. The phase returns to Working.
    pub fn end_break(&mut self, ended_at: DateTime<Utc>) -> Option<BreakEntry> {
        let entry = self.breaks.iter_mut().find(|entry| entry.is_open())?;
        entry.close(ended_at);
        let closed = entry.clone();
        self.phase = SessionPhase::Working;
        Some(closed)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
