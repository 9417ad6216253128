//! In-memory collaborator implementations. Used by the test suite and by
//! hosts that want to drive the engine without a real backend.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{AttendanceSession, BreakEntry, ScreenCapture, SessionStatus};

use super::{AttendanceStore, BlobStorage, EodReports};

#[derive(Default)]
struct MemoryStoreInner {
    sessions: HashMap<String, AttendanceSession>,
    breaks: Vec<BreakEntry>,
    captures: Vec<ScreenCapture>,
}

/// HashMap-backed `AttendanceStore`.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn session(&self, session_id: &str) -> Option<AttendanceSession> {
        self.lock().sessions.get(session_id).cloned()
    }

    pub fn captures(&self) -> Vec<ScreenCapture> {
        self.lock().captures.clone()
    }

    pub fn active_session_count(&self, user_id: &str) -> usize {
        self.lock()
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.status == SessionStatus::Active)
            .count()
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn insert_session(&self, session: &AttendanceSession) -> Result<()> {
        self.lock().sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn active_session_for_user(&self, user_id: &str) -> Result<Option<AttendanceSession>> {
        Ok(self
            .lock()
            .sessions
            .values()
            .find(|s| s.user_id == user_id && s.status == SessionStatus::Active)
            .cloned())
    }

    async fn complete_session(
        &self,
        session_id: &str,
        clock_out: DateTime<Utc>,
        total_hours: f64,
    ) -> Result<()> {
        let mut inner = self.lock();
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| anyhow!("session {session_id} not found"))?;
        session.complete(clock_out, total_hours);
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.sessions.remove(session_id);
        inner.breaks.retain(|entry| entry.session_id != session_id);
        // captures stay; retention is not this subsystem's concern
        Ok(())
    }

    async fn set_monitoring_enabled(
        &self,
        session_id: &str,
        enabled: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.lock();
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| anyhow!("session {session_id} not found"))?;
        session.screen_monitoring_enabled = enabled;
        session.updated_at = updated_at;
        Ok(())
    }

    async fn insert_break(&self, entry: &BreakEntry) -> Result<()> {
        self.lock().breaks.push(entry.clone());
        Ok(())
    }

    async fn close_break(
        &self,
        break_id: &str,
        ended_at: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Result<()> {
        let mut inner = self.lock();
        let entry = inner
            .breaks
            .iter_mut()
            .find(|entry| entry.id == break_id)
            .ok_or_else(|| anyhow!("break {break_id} not found"))?;
        entry.break_end = Some(ended_at);
        entry.duration_minutes = Some(duration_minutes);
        Ok(())
    }

    async fn open_break_for_session(&self, session_id: &str) -> Result<Option<BreakEntry>> {
        Ok(self
            .lock()
            .breaks
            .iter()
            .find(|entry| entry.session_id == session_id && entry.is_open())
            .cloned())
    }

    async fn breaks_for_session(&self, session_id: &str) -> Result<Vec<BreakEntry>> {
        Ok(self
            .lock()
            .breaks
            .iter()
            .filter(|entry| entry.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn insert_capture(&self, capture: &ScreenCapture) -> Result<()> {
        self.lock().captures.push(capture.clone());
        Ok(())
    }
}

/// EOD-report collaborator keyed by session id.
#[derive(Default)]
pub struct MemoryEodReports {
    submitted: Mutex<HashSet<String>>,
}

impl MemoryEodReports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&self, session_id: &str) {
        self.submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(session_id.to_string());
    }
}

#[async_trait]
impl EodReports for MemoryEodReports {
    async fn has_report(&self, session_id: &str) -> Result<bool> {
        Ok(self
            .submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(session_id))
    }
}

/// Blob storage that records uploads and hands back `mem://` references.
#[derive(Default)]
pub struct MemoryBlobStorage {
    uploads: Mutex<Vec<(String, usize)>>,
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// (path, byte length) for every upload, in order.
    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.uploads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        self.uploads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((path.to_string(), bytes.len()));
        Ok(format!("mem://{path}"))
    }
}
