//! Error types for TokenAlert

use thiserror::Error;

/// Result type alias using TokenAlert's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for TokenAlert operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading the persisted price failed
    #[error("State read failed: {0}")]
    StateRead(String),

    /// Writing the persisted price failed
    #[error("State write failed: {0}")]
    StateWrite(String),

    /// Redis error
    #[error("Redis error: {0}")]
    Redis(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state read error
    pub fn state_read(msg: impl Into<String>) -> Self {
        Self::StateRead(msg.into())
    }

    /// Create a state write error
    pub fn state_write(msg: impl Into<String>) -> Self {
        Self::StateWrite(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
