mod controller;
pub mod record;
mod state;
mod ticker;

pub use controller::{AttemptController, AttemptSettings, SubmitOutcome, TICK_PERIOD};
pub use record::AttemptRecord;
pub use state::{format_remaining, remaining_seconds, SessionState};
