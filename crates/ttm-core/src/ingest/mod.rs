//! Turns a sequence of full taxonomy snapshots into an append-only event log.

mod ingester;
mod snapshot;

pub use ingester::{DifferentialIngester, IngestReport};
pub use snapshot::{parse_version_date, InMemorySnapshot, SnapshotNode, SnapshotSource};
