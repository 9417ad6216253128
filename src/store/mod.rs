//! Boundary traits for the external collaborators this engine writes to and
//! consults: the persistent store, the end-of-day report service, and blob
//! storage. The engine owns no storage of its own; hosts supply
//! implementations backed by whatever datastore the portal uses.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{AttendanceSession, BreakEntry, ScreenCapture};

pub mod memory;

pub use memory::{MemoryBlobStorage, MemoryEodReports, MemoryStore};

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn insert_session(&self, session: &AttendanceSession) -> Result<()>;

    /// The "active session for user" query backing the duplicate pre-check.
    async fn active_session_for_user(&self, user_id: &str) -> Result<Option<AttendanceSession>>;

    async fn complete_session(
        &self,
        session_id: &str,
        clock_out: DateTime<Utc>,
        total_hours: f64,
    ) -> Result<()>;

    /// Removes the session record and its break entries. Used by the
    /// monitoring-revocation edge; completed sessions are never deleted.
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    async fn set_monitoring_enabled(
        &self,
        session_id: &str,
        enabled: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn insert_break(&self, entry: &BreakEntry) -> Result<()>;

    async fn close_break(
        &self,
        break_id: &str,
        ended_at: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Result<()>;

    async fn open_break_for_session(&self, session_id: &str) -> Result<Option<BreakEntry>>;

    async fn breaks_for_session(&self, session_id: &str) -> Result<Vec<BreakEntry>>;

    async fn insert_capture(&self, capture: &ScreenCapture) -> Result<()>;
}

/// End-of-day report collaborator. Consulted as a clock-out precondition;
/// no other coupling.
#[async_trait]
pub trait EodReports: Send + Sync {
    async fn has_report(&self, session_id: &str) -> Result<bool>;
}

/// Opaque binary storage for capture images.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Uploads and returns the stored object's opaque reference.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String>;
}
