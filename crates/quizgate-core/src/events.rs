use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attempt::SessionState;
use crate::grader::Level;

/// Why the attempt was locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockReason {
    Expired,
    Submitted,
    Manual,
}

/// Every state change the controller makes produces an Event.
/// The presentation layer subscribes and renders them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    AttemptStarted {
        student_name: String,
        time_limit_secs: u64,
        at: DateTime<Utc>,
    },
    Tick {
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    AttemptExpired {
        at: DateTime<Utc>,
    },
    /// Emitted only by the call that actually flipped the flag.
    AttemptLocked {
        reason: LockReason,
        at: DateTime<Utc>,
    },
    SubmissionAccepted {
        score: usize,
        out_of: usize,
        level: Level,
        at: DateTime<Utc>,
    },
    /// The sink call failed. A lock event follows when the deadline
    /// passed while the call was outstanding.
    SubmissionFailed {
        message: String,
        at: DateTime<Utc>,
    },
    AttemptReset {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SessionState,
        student_name: Option<String>,
        at: DateTime<Utc>,
    },
}
