//! Error handling for audioloader

use thiserror::Error;

/// Main error type for audioloader
#[derive(Debug, Error)]
pub enum AudioloaderError {
    #[error("yt-dlp not found. Please install yt-dlp")]
    YtDlpNotFound,

    #[error("Failed to extract media info: {0}")]
    ProbeFailed(String),

    /// Carries the collaborator's message verbatim; it is surfaced in retry
    /// notices and per-item failure messages.
    #[error("{0}")]
    FetchFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("cancelled")]
    Cancelled,

    #[error("Run task failed: {0}")]
    TaskFailed(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T, E = AudioloaderError> = std::result::Result<T, E>;
