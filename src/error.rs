// src/error.rs
//! Error types for the GPS doctor

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GpsError>;

#[derive(Debug, Error)]
pub enum GpsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The prioritized candidate list was empty after all fallbacks.
    #[error("No candidate GPS ports found")]
    NoCandidatesFound,

    /// Every port/baud combination timed out or failed to open.
    #[error("Unable to read GPS data from any candidate port ({attempts} attempts)")]
    AllCandidatesExhausted { attempts: usize },
}
