//! Elapsed-time presenter: the read-only view recomputed on every display
//! tick. Pure functions of session + ledger state + the current time.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ledger::{self, BreakCategory, BreakPolicy};
use crate::models::{AttendanceSession, BreakEntry};
use crate::policy::REQUIRED_SHIFT_MINUTES;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElapsedSnapshot {
    /// Elapsed since clock-in, net of breaks.
    pub worked_ms: u64,
    pub break_ms: u64,
    pub lunch_minutes: i64,
    pub other_minutes: i64,
    pub excess_minutes: i64,
    pub required_minutes: i64,
    /// Minutes until the gate clears; zero once the requirement is met.
    pub remaining_minutes: i64,
    pub on_break: bool,
    /// Count-up `HH:MM:SS` of worked time.
    pub worked_display: String,
    /// Countdown `HH:MM:SS` to the required shift end.
    pub remaining_display: String,
}

pub fn format_hms(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

pub fn build_snapshot(
    session: &AttendanceSession,
    entries: &[BreakEntry],
    policy: &BreakPolicy,
    now: DateTime<Utc>,
) -> ElapsedSnapshot {
    let elapsed_ms = session.elapsed_ms(now);
    let break_ms = ledger::total_break_ms(entries, now);
    let worked_ms = elapsed_ms.saturating_sub(break_ms);

    let excess = ledger::excess_minutes(entries, now, policy);
    let required_minutes = REQUIRED_SHIFT_MINUTES + excess.total();
    let elapsed_minutes = (elapsed_ms / 60_000) as i64;
    let remaining_minutes = (required_minutes - elapsed_minutes).max(0);
    let on_break = entries.iter().any(|entry| entry.is_open());

    ElapsedSnapshot {
        worked_ms,
        break_ms,
        lunch_minutes: ledger::category_minutes(entries, BreakCategory::Lunch, now),
        other_minutes: ledger::category_minutes(entries, BreakCategory::Other, now),
        excess_minutes: excess.total(),
        required_minutes,
        remaining_minutes,
        on_break,
        worked_display: format_hms(worked_ms),
        remaining_display: format_hms(remaining_minutes.max(0) as u64 * 60_000),
    }
}
