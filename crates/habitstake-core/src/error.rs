//! Core error types for habitstake-core.
//!
//! This module defines the error hierarchy using thiserror. Passive paths
//! (penalties, reminders) log these errors instead of surfacing them to the
//! user; request handlers map them onto status codes.

use std::path::PathBuf;
use thiserror::Error;

use crate::habit::HabitId;

/// Core error type for habitstake-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Key-value store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Habit lookup failed
    #[error("Habit not found: {0}")]
    HabitNotFound(HabitId),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked by another writer
    #[error("Store is locked")]
    Locked,

    /// A stored value could not be decoded
    #[error("Corrupt record at '{key}': {message}")]
    Corrupt { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
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

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),
}

/// Validation errors for habits and wallet operations.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Required field absent
    #[error("Missing required field '{0}'")]
    MissingField(String),
}

/// Push delivery failures, recorded per device and habit. Never fatal to a
/// tick, so they stay out of [`CoreError`].
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Push service rejected the message
    #[error("Push service rejected message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// Subscription no longer exists at the push service
    #[error("Subscription expired (HTTP {0})")]
    Gone(u16),

    /// Network or client failure
    #[error("Transport failure: {0}")]
    Transport(String),
}

/// Payment collaborator failures. Only logged by callers.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Payment endpoint not configured
    #[error("Payment endpoint not configured")]
    NotConfigured,

    /// Processor declined the charge request
    #[error("Payment request declined (HTTP {status}): {body}")]
    Declined { status: u16, body: String },

    /// Network or decoding failure
    #[error("Payment transport failure: {0}")]
    Transport(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                StorageError::Locked
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::Transport(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_message() {
        let err: CoreError = ValidationError::MissingField("endTime".into()).into();
        assert_eq!(err.to_string(), "Validation error: Missing required field 'endTime'");

        let err: CoreError = StorageError::Locked.into();
        assert_eq!(err.to_string(), "Storage error: Store is locked");
    }
}
