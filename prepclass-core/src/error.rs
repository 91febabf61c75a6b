//! Error types for the PrepClass core library.

use thiserror::Error;

/// Top-level error type for all core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration or request input. Fails fast, before any
    /// network or database work.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No stored document with the given ID.
    #[error("Record not found: {0}")]
    NotFound(crate::RecordId),

    /// Attempt to register a username that already exists.
    #[error("Username already taken: {0}")]
    UserExists(String),

    /// Username failed the charset/length rules.
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Password failed the minimum requirements.
    #[error("Password rejected: {0}")]
    WeakPassword(String),

    /// Argon2 hashing or hash parsing failed.
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite error from the session store or user directory.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No renderer registered for the requested export format.
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// A registered renderer failed to produce output.
    #[error("{format} rendering failed: {reason}")]
    Render {
        /// Which export format was being rendered.
        format: String,
        /// Why the renderer failed.
        reason: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, CoreError>;
