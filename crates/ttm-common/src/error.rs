//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors that can arise in ambient, cross-crate utilities (logging setup,
/// environment parsing). Domain errors (storage, ingest, query) live in
/// `ttm-core::error` instead.
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}
