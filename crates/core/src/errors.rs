//! Crate-wide error and result types.

use thiserror::Error;

/// Errors surfaced by the tracker domain, storage, and sync boundaries.
#[derive(Debug, Error)]
pub enum Error {
    /// Persistence failed (I/O, temp-file, rename).
    #[error("storage failure: {0}")]
    Storage(String),

    /// JSON (de)serialization failed.
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Caller supplied input the domain cannot accept.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The sync transport could not complete a request.
    #[error("sync transport failure: {0}")]
    Transport(String),
}

impl Error {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
