//! Errors from the encoding layer.

use openfloor_types::OpenFloorError;
use thiserror::Error;

/// Errors from encoding, decoding and storing records.
#[derive(Debug, Error)]
pub enum WireError {
    /// The JSON was well-formed but did not describe a valid record.
    #[error("Invalid record: {0}")]
    Model(#[from] OpenFloorError),
    /// Reading or writing a file or stream failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The input was not JSON at all.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The input exceeded the codec's `max_document_bytes`.
    #[error("Document too large: {size} bytes (max {max})")]
    DocumentTooLarge { size: u64, max: u64 },
    /// Codec settings could not be parsed or are out of range.
    #[error("Config error: {0}")]
    Config(String),
}

impl WireError {
    /// The record validation failure behind this error, if that is what it is.
    pub fn validation(&self) -> Option<&openfloor_types::ValidationError> {
        match self {
            Self::Model(e) => e.validation(),
            _ => None,
        }
    }
}

/// Convenience alias.
pub type WireResult<T> = Result<T, WireError>;
