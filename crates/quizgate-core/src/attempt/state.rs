use serde::{Deserialize, Serialize};

use super::record::AttemptRecord;

/// Where the attempt stands right now.
///
/// Always derived from the stored record and the current time, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    InProgress { remaining_seconds: u64 },
    /// Time ran out but the lock has not been written yet.
    Expired,
    Locked,
}

impl SessionState {
    pub fn derive(record: &AttemptRecord, now_ms: i64, time_limit_secs: u64) -> Self {
        if record.used {
            return SessionState::Locked;
        }
        match record.started() {
            None => SessionState::NotStarted,
            Some((started_at, _)) => match remaining_seconds(started_at, now_ms, time_limit_secs) {
                0 => SessionState::Expired,
                remaining_seconds => SessionState::InProgress { remaining_seconds },
            },
        }
    }

    pub fn remaining_seconds(&self) -> Option<u64> {
        match self {
            SessionState::InProgress { remaining_seconds } => Some(*remaining_seconds),
            _ => None,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, SessionState::Locked)
    }
}

/// `limit - whole seconds elapsed`, floored at zero.
///
/// A clock that moved backwards behind `started_at` counts as no time
/// elapsed; the deadline is never extended past the limit.
pub fn remaining_seconds(started_at_ms: i64, now_ms: i64, time_limit_secs: u64) -> u64 {
    let elapsed_ms = now_ms.saturating_sub(started_at_ms).max(0);
    let elapsed_secs = (elapsed_ms / 1000) as u64;
    time_limit_secs.saturating_sub(elapsed_secs)
}

/// `MM:SS`, minutes not wrapped at the hour.
pub fn format_remaining(total_seconds: u64) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
