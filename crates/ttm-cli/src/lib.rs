//! Taxonomy Time Machine CLI
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! A thin command-line front end over `ttm-core`: ingest a pre-parsed
//! taxonomy snapshot, then run point-in-time queries against the resulting
//! event log.

pub mod commands;
pub mod config;
pub mod error;
pub mod fixture;

pub use error::{CliError, Result};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Taxonomy Time Machine: a temporal query engine over taxonomy history.
#[derive(Parser, Debug)]
#[command(name = "ttm")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the SQLite database file
    #[arg(long, env = "DATABASE_PATH", global = true)]
    pub database_path: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a pre-parsed taxonomy snapshot from a JSON fixture file
    Ingest {
        /// Path to a fixture JSON file (see `ttm_cli::fixture` for the format)
        #[arg(long)]
        fixture: String,
    },

    /// List the raw events recorded for a tax id
    Events {
        tax_id: String,
        /// Only include events up to and including this date (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Show the ancestor chain for a tax id
    Lineage {
        tax_id: String,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// List the direct children of a tax id
    Children {
        tax_id: String,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Show the distinct lineages a tax id has held over time
    Versions {
        tax_id: String,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Full-text search over taxon names, past and present
    Search {
        query: String,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Print a uniformly random species-rank taxon
    RandomSpecies,
}
