//! Core error types for onepercent-core.
//!
//! Validation errors are raised before any store call. Store errors are
//! logged by the caller and surfaced unchanged; nothing here is retried.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for onepercent-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input rejected before reaching the store
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Account and session errors
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// No habit with this id for the signed-in owner
    #[error("Habit not found: {0}")]
    NotFound(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored row could not be decoded
    #[error("Corrupt row in '{table}': {message}")]
    CorruptRow { table: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
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

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Habit name is empty after trimming
    #[error("Habit name must not be empty")]
    EmptyName,

    /// Reminder time is not HH:MM
    #[error("Invalid reminder time '{0}': expected HH:MM (24-hour)")]
    InvalidTime(String),

    /// Unknown weekday name
    #[error("Invalid weekday '{0}': expected monday..sunday")]
    InvalidWeekday(String),

    /// Unknown frequency name
    #[error("Invalid frequency '{0}': expected daily, weekly or monthly")]
    InvalidFrequency(String),

    /// Completion date is not YYYY-MM-DD
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Email address is missing or malformed
    #[error("Invalid email address '{0}'")]
    InvalidEmail(String),

    /// Password fails one or more policy rules
    #[error("Password does not meet requirements: {}", .unmet.join(", "))]
    WeakPassword { unmet: Vec<String> },

    /// Password confirmation differs
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Account and session errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Email already registered
    #[error("An account already exists for {0}")]
    AlreadyRegistered(String),

    /// Wrong email or password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No user signed in
    #[error("Not signed in; run `onepercent auth signin` first")]
    NotSignedIn,
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_password_lists_unmet_rules() {
        let err = ValidationError::WeakPassword {
            unmet: vec!["At least 8 characters".into(), "At least one number".into()],
        };
        assert_eq!(
            err.to_string(),
            "Password does not meet requirements: At least 8 characters, At least one number"
        );
    }

    #[test]
    fn validation_wraps_into_core_error() {
        let err: CoreError = ValidationError::EmptyName.into();
        assert!(matches!(err, CoreError::Validation(ValidationError::EmptyName)));
    }

    #[test]
    fn query_errors_map_to_query_failed() {
        let err: DatabaseError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, DatabaseError::QueryFailed(_)));
    }
}
