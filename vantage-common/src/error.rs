//! Common error types for Vantage

use thiserror::Error;

/// Common result type for Vantage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Vantage services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Twitch API request failure
    #[error("Twitch API error: {0}")]
    Twitch(String),

    /// Start-stream requested while a different stream is already tracked.
    /// Indicates two concurrent "online" signals for different streams.
    #[error("Stream conflict: tracking stream {active}, refused start for stream {requested}")]
    StreamConflict { active: i64, requested: i64 },

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
