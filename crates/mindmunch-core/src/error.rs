//! Core error types for mindmunch-core.
//!
//! Each subsystem has its own `thiserror` enum; `CoreError` wraps them for
//! callers (the CLI host) that only need to report a failure.
//!
//! Expected conditions such as a stale limit id or an empty flashcard set are
//! ordinary variants here, never panics.

use std::path::PathBuf;
use thiserror::Error;

use crate::budget::LimitId;

/// Core error type for mindmunch-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Durable store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Budget ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Extension gate errors
    #[error("Quiz error: {0}")]
    Quiz(#[from] QuizError),

    /// OS restriction control errors
    #[error("Shield error: {0}")]
    Shield(#[from] ShieldError),

    /// Activity monitor errors
    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

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

/// Durable key-value store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    Sqlite(#[source] rusqlite::Error),

    /// Store is locked by another writer
    #[error("Store is locked")]
    Locked,

    /// An in-memory store lock was poisoned by a panicking writer
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Budget ledger errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No limit with this id (deleted, or a stale UI reference)
    #[error("Limit not found: {0}")]
    NotFound(LimitId),

    /// Duration outside the picker ranges
    #[error("Invalid limit duration {hours}h {minutes}m: hours must be 0-23 and minutes 0-59")]
    InvalidDuration { hours: u32, minutes: u32 },
}

/// Why no quiz can be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoQuizReason {
    #[error("no active study set")]
    NoActiveSet,

    #[error("study set '{name}' has {distinct} distinct definitions, need at least {required}")]
    NotEnoughCards {
        name: String,
        distinct: usize,
        required: usize,
    },
}

/// Extension gate errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    /// No flashcards to build a question from
    #[error("No quiz available: {0}")]
    NoQuizAvailable(#[from] NoQuizReason),

    /// Submit or next-question without a started session
    #[error("No active quiz session")]
    NoActiveSession,

    /// The current question was already answered
    #[error("Question already answered")]
    AlreadyAnswered,

    /// next_question() called before the current question was answered
    #[error("Current question has not been answered yet")]
    AwaitingAnswer,

    /// The submitted choice is not one of the presented options
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// Study set library failures
    #[error("Study set error: {0}")]
    Library(String),
}

/// OS restriction control errors.
#[derive(Error, Debug)]
pub enum ShieldError {
    /// The OS rejected the restriction update
    #[error("Failed to apply shield: {0}")]
    ApplyFailed(String),

    /// The OS rejected clearing the restriction
    #[error("Failed to clear shield: {0}")]
    ClearFailed(String),
}

/// Activity monitor scheduler errors.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Registering an activity window failed
    #[error("Failed to start monitoring '{activity}': {message}")]
    StartFailed { activity: String, message: String },

    /// Unregistering activities failed
    #[error("Failed to stop monitoring: {0}")]
    StopFailed(String),

    /// Scheduling a background wake failed
    #[error("Failed to schedule background wake: {0}")]
    WakeFailed(String),
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

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg)
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                StoreError::Locked
            }
            _ => StoreError::Sqlite(err),
        }
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
