//! Core error types for mission-focus-core.
//!
//! Every fallible path in the library reports through one of these
//! thiserror enums. None of them is fatal to accounting: callers log and
//! carry on with the in-memory state.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Core error type for mission-focus-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote classification errors
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    /// Ranking backend errors
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Engine message-passing errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

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

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Stored state could not be decoded
    #[error("Corrupt value for key '{key}': {message}")]
    Corrupt { key: String, message: String },
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Remote classification errors.
///
/// All of these collapse to the `unproductive` default at the classifier
/// boundary; they are only surfaced for logging.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// No API key configured
    #[error("No remote classifier credential configured")]
    MissingCredential,

    /// Request exceeded its deadline
    #[error("Remote classification timed out after {0:?}")]
    Timeout(Duration),

    /// Caller cancelled the request
    #[error("Remote classification cancelled")]
    Cancelled,

    /// Transport failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Classifier API error (HTTP {status}): {body}")]
    Http { status: u16, body: String },

    /// Response text did not name exactly one category
    #[error("Unparseable classifier response: {0:?}")]
    Unparseable(String),

    /// Endpoint could not be turned into a request URL
    #[error("Invalid classifier endpoint: {0}")]
    Url(#[from] url::ParseError),
}

/// Ranking backend errors.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No identity configured; sync is disabled
    #[error("No user identity configured")]
    NoIdentity,

    /// Identity rejected before sending
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Transport failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend answered with an error status
    #[error("Backend error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    /// Base URL could not be joined with an endpoint path
    #[error("Invalid backend URL: {0}")]
    Url(#[from] url::ParseError),

    /// Local engine did not answer
    #[error("Engine unavailable: {0}")]
    Engine(#[from] EngineError),
}

/// Errors crossing the engine's message channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine task has exited
    #[error("Accounting engine is not running")]
    Closed,

    /// No reply within the caller's bound
    #[error("Accounting engine did not reply within {0:?}")]
    Timeout(Duration),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
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
