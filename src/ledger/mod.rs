//! Break ledger: derived totals over a session's `BreakEntry` set.
//!
//! Everything here is a pure function of the entries plus the current
//! wall-clock time; nothing is persisted. An open break contributes its
//! live duration.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::BreakEntry;

/// Per-category break allowances, in minutes.
#[derive(Debug, Clone)]
pub struct BreakPolicy {
    /// Allowance for lunch breaks.
    pub lunch_limit_minutes: i64,

    /// Combined allowance for every non-lunch break type.
    pub non_lunch_limit_minutes: i64,
}

impl Default for BreakPolicy {
    fn default() -> Self {
        Self {
            lunch_limit_minutes: 60,
            non_lunch_limit_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakCategory {
    Lunch,
    /// Union of every non-lunch type.
    Other,
}

pub fn total_break_ms(entries: &[BreakEntry], now: DateTime<Utc>) -> u64 {
    entries.iter().map(|entry| entry.duration_ms(now)).sum()
}

pub fn category_minutes(entries: &[BreakEntry], category: BreakCategory, now: DateTime<Utc>) -> i64 {
    let ms: u64 = entries
        .iter()
        .filter(|entry| match category {
            BreakCategory::Lunch => entry.break_type.is_lunch(),
            BreakCategory::Other => !entry.break_type.is_lunch(),
        })
        .map(|entry| entry.duration_ms(now))
        .sum();
    (ms / 60_000) as i64
}

/// Break time consumed beyond the per-category allowances.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExcessBreakdown {
    pub lunch_minutes: i64,
    pub other_minutes: i64,
    pub lunch_excess_minutes: i64,
    pub other_excess_minutes: i64,
}

impl ExcessBreakdown {
    pub fn total(&self) -> i64 {
        self.lunch_excess_minutes + self.other_excess_minutes
    }
}

pub fn excess_minutes(
    entries: &[BreakEntry],
    now: DateTime<Utc>,
    policy: &BreakPolicy,
) -> ExcessBreakdown {
    let lunch_minutes = category_minutes(entries, BreakCategory::Lunch, now);
    let other_minutes = category_minutes(entries, BreakCategory::Other, now);
    ExcessBreakdown {
        lunch_minutes,
        other_minutes,
        lunch_excess_minutes: (lunch_minutes - policy.lunch_limit_minutes).max(0),
        other_excess_minutes: (other_minutes - policy.non_lunch_limit_minutes).max(0),
    }
}
