// Error types for ghstats.
// Separates retryable transport failures from protocol and cache corruption errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GhstatsError {
    /// Network, DNS, timeout or non-success HTTP status. Retryable on a later run.
    #[error("transport error: {0}")]
    Transport(String),

    /// Response shape or pagination metadata we cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("Rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    #[error("cache file {} is corrupt: {reason}", .path.display())]
    CorruptCache { path: PathBuf, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid repository '{0}', expected owner/name")]
    InvalidRepository(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for GhstatsError {
    fn from(err: reqwest::Error) -> Self {
        GhstatsError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GhstatsError>;
