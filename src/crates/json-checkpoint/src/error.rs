//! Error types for checkpoint operations

use thiserror::Error;

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors that can occur during checkpoint operations
///
/// "Not found" on reads is not an error: [`get_tuple`](crate::CheckpointSaver::get_tuple)
/// returns `Ok(None)` and [`list`](crate::CheckpointSaver::list) yields an empty stream.
/// [`CheckpointError::NotFound`] is only produced by `put_writes` under
/// [`PutWritesPolicy::Strict`](crate::config::PutWritesPolicy::Strict).
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// Checkpoint not found
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    /// Encode/decode error, including a corrupt backing file
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Codec produced something that cannot be stored in the JSON table
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Failure reported by a custom [`TableStore`](crate::TableStore) backend
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid checkpoint or config
    #[error("Invalid checkpoint: {0}")]
    Invalid(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Background write task panicked or was aborted
    #[error("Write task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl CheckpointError {
    /// Whether a failed load should be retried.
    ///
    /// I/O failures and decode failures are both treated as transient: a
    /// reader racing a writer from another process can observe a half-written
    /// file.
    pub fn is_transient(&self) -> bool {
        matches!(self, CheckpointError::Io(_) | CheckpointError::Serialization(_))
    }
}
