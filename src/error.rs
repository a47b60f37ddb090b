//! Error types for agentgate.
//!
//! Storage errors propagate uncaught out of the store functions; all
//! catching and user-facing conversion happens in the request layer.

use thiserror::Error;

/// Result type alias for agentgate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in agentgate operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Agent error: {0}")]
    Agent(String),
}
