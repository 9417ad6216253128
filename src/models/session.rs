use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
        }
    }
}

/// One continuous clock-in-to-clock-out work period.
///
/// At most one session per user may be `Active` at a time. The record is
/// mutable only while active; once completed it is a read-only history row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSession {
    pub id: String,
    pub user_id: String,
    pub clock_in: DateTime<Utc>,
    pub clock_out: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub screen_monitoring_enabled: bool,
    /// Worked hours net of breaks, two-decimal rounded. Set only at completion.
    pub total_hours: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceSession {
    pub fn begin(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            clock_in: now,
            clock_out: None,
            status: SessionStatus::Active,
            screen_monitoring_enabled: false,
            total_hours: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn complete(&mut self, clock_out: DateTime<Utc>, total_hours: f64) {
        self.status = SessionStatus::Completed;
        self.clock_out = Some(clock_out);
        self.total_hours = Some(total_hours);
        self.updated_at = clock_out;
    }

    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        (now - self.clock_in).num_milliseconds().max(0) as u64
    }
}
