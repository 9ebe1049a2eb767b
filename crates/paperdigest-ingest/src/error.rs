//! Errors for the ingest job and its collaborators.

use paperdigest::error::DigestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    /// The summarization core failed.
    #[error(transparent)]
    Digest(#[from] DigestError),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// The paper feed could not be queried.
    #[error("paper source failed: {0}")]
    Source(String),

    #[error("paper store failed: {0}")]
    Store(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Full text could not be pulled out of a paper.
    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two embeddings that must be blended have different lengths.
    #[error("embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, IngestError>;
