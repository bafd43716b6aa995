//! In-process key-value store.
//!
//! Used by tests and by dry-run ticks. A single mutex guards the map, which
//! makes `set_if_absent` atomic across threads.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use super::KvStore;
use crate::error::StorageError;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Entry>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::QueryFailed("memory store mutex poisoned".into()))
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let now = Utc::now();
        Ok(self
            .lock()?
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StorageError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Utc::now() + ttl),
        };
        self.lock()?.insert(key.to_string(), entry);
        Ok(())
    }

    fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool, StorageError> {
        let now = Utc::now();
        let mut entries = self.lock()?;
        if entries.get(key).is_some_and(|e| e.is_live(now)) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
        Ok(true)
    }

    fn replace_if(&self, key: &str, expected: Option<&str>, value: &str) -> Result<bool, StorageError> {
        let now = Utc::now();
        let mut entries = self.lock()?;
        let current = entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.as_str());
        if current != expected {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.lock()?.remove(key).is_some())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        let now = Utc::now();
        Ok(self
            .lock()?
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect())
    }
}
