//! SQLite-backed session store.
//!
//! A single `kv` table holds the attempt record keys. Multi-key writes run
//! inside one transaction so a crash never leaves half an attempt behind.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};

use super::{data_dir, SessionStore};
use crate::error::StoreError;

/// SQLite database for the device-local attempt record.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/quizgate/quizgate.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open() -> Result<Self, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Self::open_at(dir.join("quizgate.db"))
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl SessionStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn apply(&self, writes: &[(&str, Option<&str>)]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for (key, value) in writes {
            match value {
                Some(value) => tx.execute(
                    "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                    params![key, value],
                )?,
                None => tx.execute("DELETE FROM kv WHERE key = ?1", params![key])?,
            };
        }
        tx.commit()?;
        Ok(())
    }

    fn put_if_changed(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let changed = self.conn()?.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value
             WHERE kv.value <> excluded.value",
            params![key, value],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.get("test").unwrap().is_none());
        db.set("test", "hello").unwrap();
        assert_eq!(db.get("test").unwrap().unwrap(), "hello");
        db.remove("test").unwrap();
        assert!(db.get("test").unwrap().is_none());
    }

    #[test]
    fn apply_mixes_writes_and_deletes() {
        let db = Database::open_memory().unwrap();
        db.set("a", "1").unwrap();
        db.apply(&[("a", None), ("b", Some("2")), ("c", Some("3"))])
            .unwrap();
        assert!(db.get("a").unwrap().is_none());
        assert_eq!(db.get("b").unwrap().as_deref(), Some("2"));
        assert_eq!(db.get("c").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn put_if_changed_reports_first_write_only() {
        let db = Database::open_memory().unwrap();
        assert!(db.put_if_changed("flag", "1").unwrap());
        assert!(!db.put_if_changed("flag", "1").unwrap());
        assert!(db.put_if_changed("flag", "2").unwrap());
        assert_eq!(db.get("flag").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("quizgate.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.set("quizgate_attempt_used_v1", "1").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(
            db.get("quizgate_attempt_used_v1").unwrap().as_deref(),
            Some("1")
        );
    }
}
