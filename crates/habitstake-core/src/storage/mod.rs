mod config;
pub mod snapshot;
pub mod database;
pub mod memory;

pub use config::{ClientConfig, Config, DispatchConfig, PaymentConfig};
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use chrono::Duration;

use crate::error::StorageError;

/// Returns `~/.config/habitstake[-dev]/` based on HABITSTAKE_ENV.
///
/// Set HABITSTAKE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HABITSTAKE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("habitstake-dev")
    } else {
        base_dir.join("habitstake")
    };

    std::fs::create_dir_all(&dir).map_err(|e| StorageError::DataDir(e.to_string()))?;
    Ok(dir)
}

/// Key-value store with optional per-key expiry.
///
/// No multi-key transactions are assumed. `set_if_absent` and `replace_if`
/// must be atomic: the reminder dedup relies on the first, snapshot saves
/// from concurrent client processes on the second.
pub trait KvStore {
    /// Value for `key`, or `None` when absent or expired.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Unconditional write. `ttl = None` never expires.
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StorageError>;

    /// Write only if no live value exists. Returns whether the write happened.
    fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool, StorageError>;

    /// Write a non-expiring value only if the live value still equals
    /// `expected` (`None`: no live value). Returns whether the write happened.
    fn replace_if(&self, key: &str, expected: Option<&str>, value: &str) -> Result<bool, StorageError>;

    /// Returns whether a value was removed.
    fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// All live entries whose key starts with `prefix`, ordered by key.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError>;
}
