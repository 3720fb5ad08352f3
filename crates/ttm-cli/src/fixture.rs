//! Loads a pre-parsed taxonomy snapshot from a JSON fixture file.
//!
//! Parsing a real NCBI taxdump archive is out of scope for this workspace
//! (see the crate-level Non-goals); this is the on-disk format `ttm ingest
//! --fixture` reads instead, meant for local testing and small synthetic
//! taxonomies rather than production ingestion of the real dump.

use serde::Deserialize;

use ttm_core::ingest::{InMemorySnapshot, SnapshotNode};
use ttm_core::TaxId;

use crate::error::{CliError, Result};

#[derive(Debug, Deserialize)]
struct FixtureNode {
    tax_id: String,
    parent_id: Option<String>,
    name: String,
    rank: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    path: String,
    version_date: chrono::NaiveDate,
    nodes: Vec<FixtureNode>,
}

pub fn load(fixture_path: &str) -> Result<InMemorySnapshot> {
    let raw = std::fs::read_to_string(fixture_path)?;
    let fixture: FixtureFile = serde_json::from_str(&raw)?;

    if fixture.nodes.is_empty() {
        return Err(CliError::fixture(format!(
            "{fixture_path} contains no taxonomy nodes"
        )));
    }

    Ok(InMemorySnapshot {
        path: fixture.path,
        version_date: fixture.version_date,
        nodes: fixture
            .nodes
            .into_iter()
            .map(|n| SnapshotNode {
                tax_id: TaxId::from(n.tax_id),
                parent_id: n.parent_id.map(TaxId::from),
                name: n.name,
                rank: n.rank,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_a_minimal_fixture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "path": "snap-1",
                "version_date": "2020-01-01",
                "nodes": [
                    {{"tax_id": "1", "parent_id": null, "name": "root", "rank": "no rank"}},
                    {{"tax_id": "2", "parent_id": "1", "name": "Bacteria", "rank": "superkingdom"}}
                ]
            }}"#
        )
        .unwrap();

        let snapshot = load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(snapshot.path, "snap-1");
        assert_eq!(snapshot.nodes.len(), 2);
    }

    #[test]
    fn rejects_a_fixture_with_no_nodes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"path": "empty", "version_date": "2020-01-01", "nodes": []}}"#
        )
        .unwrap();
        assert!(load(file.path().to_str().unwrap()).is_err());
    }
}
