//! Error types for logsync-daemon

use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Record store and execution reader errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stale resource version on update
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error
    #[error("Query error: {0}")]
    Query(String),
}

/// Build engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine did not answer the pre-check
    #[error("Engine unreachable: {0}")]
    Unreachable(String),

    /// The engine has no log for the requested step
    #[error("Log unavailable: {0}")]
    LogUnavailable(String),

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Engine answered with something unusable
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Base URL cannot address engine endpoints
    #[error("Invalid engine URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
