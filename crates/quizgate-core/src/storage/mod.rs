mod config;
pub mod database;
mod memory;

pub use config::Config;
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::StoreError;

/// Device-scoped durable key-value storage.
///
/// Values survive process restarts and are only removed by an explicit
/// reset or by the user deleting the data directory. Nothing here is a
/// security boundary: anyone with access to the device can clear it.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Apply every write or all of none. `None` removes the key.
    fn apply(&self, writes: &[(&str, Option<&str>)]) -> Result<(), StoreError>;

    /// Write `value` unless the key already holds exactly that. Returns
    /// whether the stored value changed; of several callers racing to
    /// write the same value, exactly one sees `true`.
    fn put_if_changed(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.apply(&[(key, Some(value))])
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.apply(&[(key, None)])
    }
}

/// Returns `~/.config/quizgate[-dev]/` based on QUIZGATE_ENV.
///
/// Set QUIZGATE_ENV=dev to use development data directory, or
/// QUIZGATE_HOME to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("QUIZGATE_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("QUIZGATE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("quizgate-dev")
            } else {
                base_dir.join("quizgate")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
