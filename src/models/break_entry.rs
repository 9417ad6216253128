use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BreakType {
    Lunch,
    Coffee,
    Bathroom,
    Personal,
    Other,
}

impl BreakType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakType::Lunch => "lunch",
            BreakType::Coffee => "coffee",
            BreakType::Bathroom => "bathroom",
            BreakType::Personal => "personal",
            BreakType::Other => "other",
        }
    }

    /// Lunch has its own allowance; every other type shares one bucket.
    pub fn is_lunch(&self) -> bool {
        matches!(self, BreakType::Lunch)
    }
}

/// A single break interval within a session.
///
/// At most one entry per session may be open (`break_end = None`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEntry {
    pub id: String,
    pub session_id: String,
    pub break_type: BreakType,
    pub break_start: DateTime<Utc>,
    pub break_end: Option<DateTime<Utc>>,
    /// Filled when the break closes; immutable afterward.
    pub duration_minutes: Option<i64>,
}

impl BreakEntry {
    pub fn begin(session_id: impl Into<String>, break_type: BreakType, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            break_type,
            break_start: now,
            break_end: None,
            duration_minutes: None,
        }
    }

    pub fn close(&mut self, ended_at: DateTime<Utc>) {
        self.break_end = Some(ended_at);
        self.duration_minutes = Some((ended_at - self.break_start).num_minutes().max(0));
    }

    pub fn is_open(&self) -> bool {
        self.break_end.is_none()
    }

    /// Duration so far; an open break contributes its live duration.
    pub fn duration_ms(&self, now: DateTime<Utc>) -> u64 {
        let end = self.break_end.unwrap_or(now);
        (end - self.break_start).num_milliseconds().max(0) as u64
    }
}
