//! # Quizgate Core Library
//!
//! Core logic for a timed, single-attempt multiple-choice quiz taken on a
//! shared device. The CLI binary is a thin presentation layer over this
//! crate.
//!
//! ## Architecture
//!
//! - **Attempt Controller**: a store-and-clock-derived state machine; the
//!   caller (or the controller's own tick task) drives expiry
//! - **Storage**: SQLite key-value session store and TOML configuration
//! - **Grader**: pure scoring of answers against the answer key
//! - **Sink**: one-shot HTTP delivery of the graded result
//!
//! The one-attempt rule is enforced on this device only. It is a classroom
//! convenience, not a security boundary: deleting the data directory or
//! using another device gives a fresh attempt.
//!
//! ## Key Components
//!
//! - [`AttemptController`]: Attempt lifecycle state machine
//! - [`Database`]: Device-local session store
//! - [`Config`]: Deployment configuration
//! - [`SubmissionSink`]: Trait for result collectors

pub mod attempt;
pub mod clock;
pub mod error;
pub mod events;
pub mod grader;
pub mod sink;
pub mod storage;

pub use attempt::{AttemptController, AttemptRecord, AttemptSettings, SessionState, SubmitOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AttemptError, ConfigError, CoreError, SinkError, StoreError};
pub use events::{Event, LockReason};
pub use grader::{grade, AnswerKey, Answers, Grade, Level};
pub use sink::{Ack, HttpSink, SubmissionPayload, SubmissionSink};
pub use storage::{Config, Database, MemoryStore, SessionStore};
