//! Core error types for quizgate-core.
//!
//! The attempt taxonomy (`AttemptError`) is what the presentation layer
//! shows to the student; the remaining enums describe infrastructure
//! failures underneath it.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for quizgate-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Attempt lifecycle errors, shown as the student-facing message
    #[error("{}", .0.detailed_status())]
    Attempt(#[from] AttemptError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open session store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked by another process
    #[error("Session store is locked")]
    Locked,

    /// A previous holder of the connection panicked
    #[error("Session store connection poisoned")]
    Poisoned,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Failures reported by a submission sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// No endpoint configured; nothing was sent
    #[error("submission endpoint is not configured")]
    NotConfigured,

    /// Payload could not be serialized
    #[error("failed to encode payload: {0}")]
    Encode(String),

    /// Connection, TLS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success status
    #[error("endpoint rejected submission (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Errors surfaced by the attempt lifecycle controller.
#[derive(Error, Debug)]
pub enum AttemptError {
    /// Student name too short after trimming
    #[error("name must have at least {min} characters (got {got})")]
    Validation { min: usize, got: usize },

    /// Time ran out before the submission; the attempt is now locked
    #[error("time is up; the attempt has been locked")]
    Expired,

    /// Sink failure; the attempt stays open and may be retried
    #[error("submission failed: {0}")]
    Sink(#[from] SinkError),

    /// Wrong teacher secret
    #[error("incorrect teacher secret")]
    Auth,

    /// `start` on an attempt that already has a start time
    #[error("attempt already started")]
    AlreadyStarted,

    /// `submit` or `lock` before `start`
    #[error("attempt has not been started")]
    NotStarted,

    /// Any transition other than reset on a used attempt
    #[error("attempt already used on this device")]
    AlreadyLocked,

    /// A submission is already awaiting the sink
    #[error("a submission is already in progress")]
    SubmitInFlight,

    /// Backing store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AttemptError {
    /// Status line shown to the student.
    /// [`status_text`](Self::status_text) with the transport detail of a
    /// sink failure appended.
    pub fn detailed_status(&self) -> String {
        match self {
            AttemptError::Sink(cause) => format!("{} ({cause})", self.status_text()),
            _ => self.status_text(),
        }
    }

    pub fn status_text(&self) -> String {
        match self {
            AttemptError::Validation { min, .. } => {
                format!("Enter your full name (at least {min} characters).")
            }
            AttemptError::Expired => "Time is up. Submission has been blocked.".to_string(),
            AttemptError::Sink(SinkError::NotConfigured) => {
                "The submission endpoint has not been configured yet.".to_string()
            }
            AttemptError::Sink(_) => {
                "Failed to send. Check the connection and try again.".to_string()
            }
            AttemptError::Auth => "Incorrect teacher secret.".to_string(),
            AttemptError::AlreadyStarted => "The quiz is already in progress.".to_string(),
            AttemptError::NotStarted => "Enter your name to start the quiz first.".to_string(),
            AttemptError::AlreadyLocked => {
                "This device has already used its attempt.".to_string()
            }
            AttemptError::SubmitInFlight => "Sending...".to_string(),
            AttemptError::Store(_) => "Local storage is unavailable.".to_string(),
        }
    }

    /// Whether the student can act again without a teacher reset.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AttemptError::Expired | AttemptError::AlreadyLocked)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                StoreError::Locked
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_expiry_and_lock_are_terminal() {
        assert!(!AttemptError::Expired.is_recoverable());
        assert!(!AttemptError::AlreadyLocked.is_recoverable());
        assert!(AttemptError::Auth.is_recoverable());
        assert!(AttemptError::Validation { min: 5, got: 2 }.is_recoverable());
        assert!(AttemptError::Sink(SinkError::Transport("reset".into())).is_recoverable());
    }

    #[test]
    fn status_text_mentions_minimum_length() {
        let err = AttemptError::Validation { min: 5, got: 3 };
        assert!(err.status_text().contains('5'));
    }

    #[test]
    fn core_error_shows_detailed_attempt_status() {
        let err = CoreError::from(AttemptError::Sink(SinkError::Rejected {
            status: 502,
            body: "bad gateway".into(),
        }));
        let text = err.to_string();
        assert!(text.starts_with("Failed to send"));
        assert!(text.contains("HTTP 502"));
        assert_eq!(
            CoreError::from(AttemptError::Auth).to_string(),
            "Incorrect teacher secret."
        );
    }

    #[test]
    fn unconfigured_sink_has_its_own_status() {
        let generic = AttemptError::Sink(SinkError::Transport("x".into())).status_text();
        let missing = AttemptError::Sink(SinkError::NotConfigured).status_text();
        assert_ne!(generic, missing);
    }
}
