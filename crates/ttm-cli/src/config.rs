//! Configuration for the CLI binary: where the database lives.

use crate::error::Result;

/// Default database path when `DATABASE_PATH` is not set.
pub const DEFAULT_DATABASE_PATH: &str = "taxonomy_time_machine.db";

/// CLI-wide configuration, distinct from `ttm_core::store::DbConfig` since
/// the CLI also carries fixture/output settings the store doesn't need.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
}

impl Config {
    pub fn new() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
        }
    }

    /// Load from `DATABASE_PATH`, falling back to the default rather than
    /// erroring — most subcommands are happy to create a fresh database.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();
        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = path;
        }
        Ok(config)
    }

    pub fn db_config(&self) -> ttm_core::store::DbConfig {
        ttm_core::store::DbConfig {
            path: self.database_path.clone(),
            ..Default::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

