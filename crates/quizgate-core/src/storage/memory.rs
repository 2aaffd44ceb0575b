use std::collections::HashMap;
use std::sync::Mutex;

use super::SessionStore;
use crate::error::StoreError;

/// Non-durable store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn apply(&self, writes: &[(&str, Option<&str>)]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        for (key, value) in writes {
            match value {
                Some(value) => {
                    entries.insert((*key).to_string(), (*value).to_string());
                }
                None => {
                    entries.remove(*key);
                }
            }
        }
        Ok(())
    }

    fn put_if_changed(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        if entries.get(key).map(String::as_str) == Some(value) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(true)
    }
}
