//! Error types for the document pipeline
//!
//! Each failure is scoped to a single document's pipeline run; no variant is
//! fatal to the process. Callers match on the variant to decide messaging or
//! retry.

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the extraction, highlighting, and storage layers
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input PDF cannot be read or parsed. Nothing is persisted.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// Highlight rendering cannot produce output for an otherwise valid
    /// extraction. The extraction result remains usable.
    #[error("rendering failure: {0}")]
    RenderingFailure(String),

    /// No metadata record exists for the requested document.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The persistence medium failed. Never swallowed.
    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::StorageFailure(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::StorageFailure(err.to_string())
    }
}
