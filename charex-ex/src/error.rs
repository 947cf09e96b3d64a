//! Error types for charex-ex
//!
//! Variants follow the failure classes of the pipeline. Every variant is
//! terminal for the job that hit it; nothing here is retried.

use thiserror::Error;

use crate::embedder::EmbedError;

/// Extraction and persistence error
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Malformed input (bad transcript, URL for the wrong site)
    #[error("invalid input: {0}")]
    Input(String),

    /// Network failure or non-success response
    #[error("transport error: {0}")]
    Transport(String),

    /// Image or document could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Directory or file write failure
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Malformed PNG chunk stream
    #[error("container format error: {0}")]
    ContainerFormat(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<EmbedError> for ExtractionError {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::Format(msg) => ExtractionError::ContainerFormat(msg),
            EmbedError::Io(e) => ExtractionError::Persistence(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for ExtractionError {
    fn from(err: reqwest::Error) -> Self {
        ExtractionError::Transport(err.to_string())
    }
}

/// Convenience Result type using ExtractionError
pub type Result<T> = std::result::Result<T, ExtractionError>;
