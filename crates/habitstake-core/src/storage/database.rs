//! SQLite-backed key-value store.
//!
//! Holds every piece of persisted state:
//! - the client state blob and check-in queue
//! - server-side device records
//! - short-lived reminder dedup keys (with expiry)

use std::path::Path;

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, KvStore};
use crate::error::StorageError;

const BUSY_TIMEOUT_MS: u64 = 5_000;

/// SQLite database exposing the [`KvStore`] contract.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/habitstake/habitstake.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        Self::open_at(&data_dir()?.join("habitstake.db"))
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                expires_at INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_kv_expires_at ON kv(expires_at);",
        )?;
        Ok(())
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> Result<usize, StorageError> {
        let removed = self.conn.execute(
            "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![now_ms()],
        )?;
        Ok(removed)
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn expiry_ms(ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| now_ms() + ttl.num_milliseconds())
}

impl KvStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, now_ms()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)",
            params![key, value, expiry_ms(ttl)],
        )?;
        Ok(())
    }

    fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool, StorageError> {
        // Single statement: inserts, or takes over an expired row, or does
        // nothing when a live row exists.
        let changed = self.conn.execute(
            "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE
                SET value = excluded.value, expires_at = excluded.expires_at
                WHERE kv.expires_at IS NOT NULL AND kv.expires_at <= ?4",
            params![key, value, expiry_ms(ttl), now_ms()],
        )?;
        Ok(changed == 1)
    }

    fn replace_if(&self, key: &str, expected: Option<&str>, value: &str) -> Result<bool, StorageError> {
        let Some(expected) = expected else {
            return self.set_if_absent(key, value, None);
        };
        let changed = self.conn.execute(
            "UPDATE kv SET value = ?2, expires_at = NULL
             WHERE key = ?1 AND value = ?3 AND (expires_at IS NULL OR expires_at > ?4)",
            params![key, value, expected, now_ms()],
        )?;
        Ok(changed == 1)
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let removed = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value FROM kv
             WHERE substr(key, 1, length(?1)) = ?1
               AND (expires_at IS NULL OR expires_at > ?2)
             ORDER BY key",
        )?;
        let rows = stmt.query_map(params![prefix, now_ms()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}
