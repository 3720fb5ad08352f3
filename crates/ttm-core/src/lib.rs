//! Taxonomy Time Machine core library.
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! An append-only event log of taxonomic changes over time, a differential
//! ingester that turns full taxonomy snapshots into that log, and a query
//! engine that answers point-in-time questions against it: what a taxon's
//! lineage looked like on a given date, who its children were, when its
//! classification changed, and free-text search over the names it has ever
//! held.
//!
//! # Example
//!
//! ```no_run
//! use ttm_core::store::{DbConfig, EventStore};
//! use ttm_core::query::QueryEngine;
//! use ttm_core::event::TaxId;
//!
//! # async fn run() -> ttm_core::error::Result<()> {
//! let store = EventStore::connect(&DbConfig::from_env()?).await?;
//! let engine = QueryEngine::new(&store);
//! let lineage = engine.get_lineage(&TaxId::from("9606"), None).await?;
//! # let _ = lineage;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod event;
pub mod ingest;
pub mod query;
pub mod store;

pub use error::{CoreError, Result};
pub use event::{Event, EventKind, TaxId};
