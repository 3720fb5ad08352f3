//! Domain error types for the event store, ingester, and query engine.

use thiserror::Error;

/// Result type alias used throughout `ttm-core`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors from the event store: connection setup, schema application, and
/// query execution against the SQLite database.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("invalid database configuration: {0}")]
    Config(String),
}

impl StorageError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Errors from differential ingestion: malformed snapshot input or a source
/// that has already been ingested.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("malformed snapshot entry: {0}")]
    MalformedEntry(String),

    #[error("could not parse version date from path: {0}")]
    UnparseableVersionDate(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Top-level error type composing the layers above: each subsystem owns its
/// error enum, and this type only adds `#[from]` glue plus a few query-time
/// failures that don't belong to either layer.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("taxon not found: {0}")]
    NotFound(String),

    #[error("lineage traversal exceeded the depth limit of {0}")]
    DepthLimitExceeded(usize),

    #[error(transparent)]
    Common(#[from] ttm_common::CommonError),
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::Storage(StorageError::Sqlx(e))
    }
}
