//! Early-clock-out gate. Pure decision function, no side effects.
//!
//! The required shift is eight hours plus any break-allowance excess.
//! Elapsed time is measured since clock-in, breaks included. A shortfall
//! does not block clock-out outright; the controller defers to an explicit
//! user confirmation carrying this report.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ledger::ExcessBreakdown;

pub const REQUIRED_SHIFT_MINUTES: i64 = 480;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShortfallReport {
    pub elapsed_minutes: i64,
    pub required_minutes: i64,
    pub shortfall_minutes: i64,
    pub excess: ExcessBreakdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Clear,
    Short(ShortfallReport),
}

pub fn evaluate(
    clock_in: DateTime<Utc>,
    now: DateTime<Utc>,
    excess: &ExcessBreakdown,
) -> GateDecision {
    let elapsed_minutes = (now - clock_in).num_minutes().max(0);
    let required_minutes = REQUIRED_SHIFT_MINUTES + excess.total();
    if elapsed_minutes >= required_minutes {
        GateDecision::Clear
    } else {
        GateDecision::Short(ShortfallReport {
            elapsed_minutes,
            required_minutes,
            shortfall_minutes: required_minutes - elapsed_minutes,
            excess: excess.clone(),
        })
    }
}
