//! Attempt lifecycle controller.
//!
//! The controller owns the one attempt this device is allowed. It keeps no
//! state of its own besides the tick task and the in-flight submit flag:
//! every decision re-reads the store and the clock.
//!
//! ## State Transitions
//!
//! ```text
//! NotStarted --start(name)--> InProgress --tick--> Expired --lock--> Locked
//!                             InProgress --submit ok--> Locked
//!                             InProgress --submit sink error--> InProgress
//! Locked --reset(secret)--> NotStarted
//! ```
//!
//! The lock is advisory. Anyone who deletes the data directory gets a new
//! attempt, and the teacher secret is only a deterrent.
//!
//! ## Usage
//!
//! ```ignore
//! let controller = Arc::new(AttemptController::new(settings, store, clock, sink));
//! controller.init()?;          // resolves state, arms the 1 s tick
//! controller.start("Ada Lovelace")?;
//! let outcome = controller.submit(answers).await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;

use super::record::{self, AttemptRecord};
use super::state::{self, SessionState};
use super::ticker::Ticker;
use crate::clock::Clock;
use crate::error::AttemptError;
use crate::events::{Event, LockReason};
use crate::grader::{self, AnswerKey, Answers, Grade};
use crate::sink::{Ack, SubmissionPayload, SubmissionSink};
use crate::storage::SessionStore;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct AttemptSettings {
    pub time_limit_secs: u64,
    pub min_name_len: usize,
    /// Empty disables reset.
    pub teacher_secret: String,
    pub answer_key: AnswerKey,
}

impl Default for AttemptSettings {
    fn default() -> Self {
        Self {
            time_limit_secs: 60 * 60,
            min_name_len: 5,
            teacher_secret: String::new(),
            answer_key: AnswerKey::default(),
        }
    }
}

/// Result of a submission the collector accepted.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub grade: Grade,
    pub payload: SubmissionPayload,
    pub ack: Ack,
}

impl SubmitOutcome {
    pub fn status_text(&self) -> String {
        format!(
            "Submitted successfully! Score (MC): {}/{} - Level: {}",
            self.grade.score, self.grade.out_of, self.grade.level
        )
    }
}

/// Clears the in-flight flag however `submit` returns.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct AttemptController {
    settings: AttemptSettings,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn SubmissionSink>,
    submitting: AtomicBool,
    events: broadcast::Sender<Event>,
    ticker: Mutex<Option<Ticker>>,
}

impl AttemptController {
    pub fn new(
        settings: AttemptSettings,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn SubmissionSink>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            settings,
            store,
            clock,
            sink,
            submitting: AtomicBool::new(false),
            events,
            ticker: Mutex::new(None),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &AttemptSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn record(&self) -> Result<AttemptRecord, AttemptError> {
        Ok(AttemptRecord::load(self.store.as_ref())?)
    }

    pub fn state(&self) -> Result<SessionState, AttemptError> {
        let record = self.record()?;
        Ok(self.derive(&record))
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Result<Event, AttemptError> {
        let record = self.record()?;
        Ok(Event::StateSnapshot {
            state: self.derive(&record),
            student_name: record.student_name,
            at: self.clock.now(),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Resolve whatever the store holds at process start. An attempt whose
    /// time ran out while nothing was running gets locked here.
    pub fn resolve(&self) -> Result<SessionState, AttemptError> {
        match self.state()? {
            SessionState::Expired => self.expire(),
            other => Ok(other),
        }
    }

    /// [`resolve`](Self::resolve), then arm the periodic tick unless the
    /// attempt is already locked. Calling it again re-arms a finished tick.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn init(self: &Arc<Self>) -> Result<SessionState, AttemptError> {
        let state = self.resolve()?;
        if !state.is_locked() {
            let mut slot = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
            if !slot.as_ref().is_some_and(|t| !t.is_finished()) {
                *slot = Some(Ticker::spawn(Arc::downgrade(self), TICK_PERIOD));
            }
        }
        self.emit(self.snapshot()?);
        Ok(state)
    }

    /// Cancel the tick task. Safe to call more than once.
    pub fn dispose(&self) {
        let ticker = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(ticker) = ticker {
            ticker.cancel();
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&self, name: &str) -> Result<SessionState, AttemptError> {
        let record = self.record()?;
        if record.used {
            return Err(AttemptError::AlreadyLocked);
        }
        if record.started().is_some() {
            return Err(AttemptError::AlreadyStarted);
        }

        let name = name.trim();
        let got = name.chars().count();
        if got < self.settings.min_name_len {
            return Err(AttemptError::Validation {
                min: self.settings.min_name_len,
                got,
            });
        }

        let now = self.clock.now_ms();
        record::persist_start(self.store.as_ref(), name, now)?;
        tracing::info!(
            student = name,
            limit_secs = self.settings.time_limit_secs,
            "attempt started"
        );
        self.emit(Event::AttemptStarted {
            student_name: name.to_string(),
            time_limit_secs: self.settings.time_limit_secs,
            at: self.clock.now(),
        });
        Ok(SessionState::InProgress {
            remaining_seconds: self.settings.time_limit_secs,
        })
    }

    /// Recompute remaining time; locks the attempt once it reaches zero.
    pub fn tick(&self) -> Result<SessionState, AttemptError> {
        match self.state()? {
            SessionState::InProgress { remaining_seconds } => {
                self.emit(Event::Tick {
                    remaining_seconds,
                    at: self.clock.now(),
                });
                Ok(SessionState::InProgress { remaining_seconds })
            }
            SessionState::Expired => self.expire(),
            other => Ok(other),
        }
    }

    /// Consume the attempt. Idempotent on an already locked attempt.
    pub fn lock(&self) -> Result<SessionState, AttemptError> {
        let record = self.record()?;
        if record.used {
            return Ok(SessionState::Locked);
        }
        if record.started().is_none() {
            return Err(AttemptError::NotStarted);
        }
        self.lock_with(LockReason::Manual)?;
        Ok(SessionState::Locked)
    }

    /// Grade and deliver the answers.
    ///
    /// Remaining time is checked against the clock at call time. A sink
    /// failure leaves the attempt open for another try, unless the
    /// deadline passed while the request was outstanding.
    pub async fn submit(&self, answers: Answers) -> Result<SubmitOutcome, AttemptError> {
        let _in_flight =
            InFlight::acquire(&self.submitting).ok_or(AttemptError::SubmitInFlight)?;

        let record = self.record()?;
        let now = self.clock.now_ms();
        let remaining_seconds = match self.derive_at(&record, now) {
            SessionState::InProgress { remaining_seconds } => remaining_seconds,
            SessionState::Expired => {
                self.expire()?;
                return Err(AttemptError::Expired);
            }
            SessionState::Locked => return Err(AttemptError::AlreadyLocked),
            SessionState::NotStarted => return Err(AttemptError::NotStarted),
        };
        let Some((started_at, student_name)) = record.started() else {
            return Err(AttemptError::NotStarted);
        };

        let grade = grader::grade(&answers, &self.settings.answer_key);
        let payload = SubmissionPayload {
            student_name: student_name.to_string(),
            started_at,
            submitted_at: now,
            remaining_seconds,
            answers,
            score_mc: grade.score,
            level_mc: grade.level.label().to_string(),
        };

        tracing::info!(
            sink = self.sink.name(),
            score = grade.score,
            remaining_secs = remaining_seconds,
            "submitting attempt"
        );
        match self.sink.submit(&payload).await {
            Ok(ack) => {
                // The tick may already have locked it; the flag is set either way.
                self.lock_with(LockReason::Submitted)?;
                tracing::info!(status = ack.status, "submission accepted");
                self.emit(Event::SubmissionAccepted {
                    score: grade.score,
                    out_of: grade.out_of,
                    level: grade.level,
                    at: self.clock.now(),
                });
                Ok(SubmitOutcome {
                    grade,
                    payload,
                    ack,
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, "submission failed");
                self.emit(Event::SubmissionFailed {
                    message: err.to_string(),
                    at: self.clock.now(),
                });
                let remaining = state::remaining_seconds(
                    started_at,
                    self.clock.now_ms(),
                    self.settings.time_limit_secs,
                );
                if remaining == 0 {
                    self.lock_with(LockReason::Expired)?;
                    return Err(AttemptError::Expired);
                }
                if self.record()?.used {
                    return Err(AttemptError::AlreadyLocked);
                }
                tracing::debug!(remaining_secs = remaining, "attempt left open for retry");
                Err(AttemptError::Sink(err))
            }
        }
    }

    /// Teacher reset: clear the record so the device gets a new attempt.
    ///
    /// Plain string comparison; this is a classroom deterrent, not access
    /// control.
    pub fn reset(&self, provided_secret: &str) -> Result<SessionState, AttemptError> {
        let secret = self.settings.teacher_secret.as_str();
        if secret.is_empty() || provided_secret != secret {
            tracing::warn!("teacher reset rejected");
            return Err(AttemptError::Auth);
        }
        record::clear(self.store.as_ref())?;
        tracing::info!("attempt record cleared by teacher reset");
        self.emit(Event::AttemptReset {
            at: self.clock.now(),
        });
        Ok(SessionState::NotStarted)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn derive(&self, record: &AttemptRecord) -> SessionState {
        self.derive_at(record, self.clock.now_ms())
    }

    fn derive_at(&self, record: &AttemptRecord, now_ms: i64) -> SessionState {
        SessionState::derive(record, now_ms, self.settings.time_limit_secs)
    }

    fn expire(&self) -> Result<SessionState, AttemptError> {
        self.lock_with(LockReason::Expired)?;
        Ok(SessionState::Locked)
    }

    /// Returns whether this call set the flag.
    fn lock_with(&self, reason: LockReason) -> Result<bool, AttemptError> {
        if !record::persist_lock(self.store.as_ref())? {
            return Ok(false);
        }
        tracing::info!(?reason, "attempt locked");
        let at = self.clock.now();
        if reason == LockReason::Expired {
            self.emit(Event::AttemptExpired { at });
        }
        self.emit(Event::AttemptLocked { reason, at });
        Ok(true)
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
