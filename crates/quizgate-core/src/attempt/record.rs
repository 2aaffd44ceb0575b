//! Persisted attempt record.
//!
//! Three keys in the session store make up one attempt. They are written
//! together and cleared together; there is no other place the attempt
//! lives.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::storage::SessionStore;

pub const ATTEMPT_USED_KEY: &str = "quizgate_attempt_used_v1";
pub const START_TS_KEY: &str = "quizgate_start_ts_v1";
pub const STUDENT_NAME_KEY: &str = "quizgate_student_v1";

const USED_FLAG: &str = "1";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub used: bool,
    /// Epoch milliseconds when the countdown began.
    pub started_at: Option<i64>,
    pub student_name: Option<String>,
}

impl AttemptRecord {
    pub fn load(store: &dyn SessionStore) -> Result<Self, StoreError> {
        let used = store.get(ATTEMPT_USED_KEY)?.as_deref() == Some(USED_FLAG);
        let started_at = match store.get(START_TS_KEY)? {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(ts) if ts > 0 => Some(ts),
                _ => {
                    tracing::warn!(value = %raw, "ignoring unreadable start timestamp");
                    None
                }
            },
            None => None,
        };
        let student_name = store.get(STUDENT_NAME_KEY)?.filter(|n| !n.is_empty());
        Ok(Self {
            used,
            started_at,
            student_name,
        })
    }

    /// Both halves of a started attempt are present.
    pub fn started(&self) -> Option<(i64, &str)> {
        match (self.started_at, self.student_name.as_deref()) {
            (Some(ts), Some(name)) => Some((ts, name)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub(crate) fn persist_start(
    store: &dyn SessionStore,
    student_name: &str,
    started_at: i64,
) -> Result<(), StoreError> {
    let ts = started_at.to_string();
    store.apply(&[
        (STUDENT_NAME_KEY, Some(student_name)),
        (START_TS_KEY, Some(ts.as_str())),
    ])
}

/// Returns whether this call flipped the flag.
pub(crate) fn persist_lock(store: &dyn SessionStore) -> Result<bool, StoreError> {
    store.put_if_changed(ATTEMPT_USED_KEY, USED_FLAG)
}

pub(crate) fn clear(store: &dyn SessionStore) -> Result<(), StoreError> {
    store.apply(&[
        (ATTEMPT_USED_KEY, None),
        (START_TS_KEY, None),
        (STUDENT_NAME_KEY, None),
    ])
}
