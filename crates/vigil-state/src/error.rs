//! Error types for the vigil state store.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while reading or writing the state file.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("read error on {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("write error on {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),
}
