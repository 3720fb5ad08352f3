//! The boundary between this workspace and however a taxonomy snapshot is
//! produced. Parsing a real NCBI taxdump archive is out of scope here (see
//! the crate-level Non-goals); callers provide already-parsed snapshots
//! through [`SnapshotSource`] instead — e.g. `ttm-cli`'s `--fixture` flag
//! loads one from a small JSON/TSV file for local testing.

use chrono::NaiveDate;

use crate::error::{IngestError, Result};
use crate::event::TaxId;

/// A single taxon as recorded in one snapshot of the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotNode {
    pub tax_id: TaxId,
    pub parent_id: Option<TaxId>,
    pub name: String,
    pub rank: Option<String>,
}

/// One full taxonomy snapshot: a dump path/identifier, the date it was
/// published, and the complete set of nodes it contains.
pub trait SnapshotSource {
    /// A stable identifier for this snapshot, checked against
    /// `taxonomy_source.path` to detect already-ingested input.
    fn path(&self) -> &str;

    fn version_date(&self) -> NaiveDate;

    fn nodes(&self) -> &[SnapshotNode];
}

/// An in-memory snapshot, constructed directly or loaded from a fixture file.
#[derive(Debug, Clone)]
pub struct InMemorySnapshot {
    pub path: String,
    pub version_date: NaiveDate,
    pub nodes: Vec<SnapshotNode>,
}

impl SnapshotSource for InMemorySnapshot {
    fn path(&self) -> &str {
        &self.path
    }

    fn version_date(&self) -> NaiveDate {
        self.version_date
    }

    fn nodes(&self) -> &[SnapshotNode] {
        &self.nodes
    }
}

/// Extract a `YYYY-MM-DD` date from a dump directory or file name, e.g.
/// `taxdmp_2021-03-01.zip` or `.../2021-03-01/taxdump/`.
pub fn parse_version_date(path: &str) -> Result<NaiveDate> {
    let bytes = path.as_bytes();
    for start in 0..bytes.len() {
        if start + 10 > bytes.len() {
            break;
        }
        let candidate = &path[start..start + 10];
        if is_date_shaped(candidate) {
            if let Ok(date) = NaiveDate::parse_from_str(candidate, "%Y-%m-%d") {
                return Ok(date);
            }
        }
    }
    Err(IngestError::UnparseableVersionDate(path.to_string()).into())
}

fn is_date_shaped(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b[0..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
}
