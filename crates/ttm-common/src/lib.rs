//! Taxonomy Time Machine Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, error handling, and logging configuration used across the
//! `ttm-core` and `ttm-cli` crates.
//!
//! # Example
//!
//! ```no_run
//! use ttm_common::logging::{LogConfig, init_logging};
//!
//! let config = LogConfig::from_env().unwrap();
//! init_logging(&config).unwrap();
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
