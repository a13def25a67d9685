use thiserror::Error;

use crate::types::ChunkId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Ingestion failures. Either variant means nothing from the document was stored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("Unreadable content in '{name}': {reason}")]
    UnreadableContent { name: String, reason: String },

    #[error("Vectorizer failed on '{name}': {reason}")]
    Vectorizer { name: String, reason: String },
}

/// Rating failures. The store is unchanged whenever one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RatingError {
    #[error("Rating {0} is out of range (expected 1..=5)")]
    OutOfRange(i64),

    #[error("Unknown chunk: {0}")]
    UnknownChunk(ChunkId),
}

pub type Result<T> = std::result::Result<T, Error>;
