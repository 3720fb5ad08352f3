//! End-to-end coverage of the differential ingester and query engine against
//! a small synthetic taxonomy spanning several snapshot dates. Real NCBI
//! taxdump data isn't available in this environment, so these fixtures are
//! handwritten rather than pulled from a live dump.

use chrono::NaiveDate;

use ttm_core::ingest::{DifferentialIngester, InMemorySnapshot, SnapshotNode};
use ttm_core::query::QueryEngine;
use ttm_core::store::EventStore;
use ttm_core::TaxId;

fn node(tax_id: &str, parent: Option<&str>, name: &str, rank: &str) -> SnapshotNode {
    SnapshotNode {
        tax_id: TaxId::from(tax_id),
        parent_id: parent.map(TaxId::from),
        name: name.to_string(),
        rank: Some(rank.to_string()),
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn re_ingesting_the_same_snapshot_path_is_a_no_op() {
    let store = EventStore::connect_in_memory().await.unwrap();
    let mut ingester = DifferentialIngester::resume(&store).await.unwrap();

    let snapshot = InMemorySnapshot {
        path: "taxdmp_2020-01-01.zip".to_string(),
        version_date: date(2020, 1, 1),
        nodes: vec![
            node("1", None, "root", "no rank"),
            node("2", Some("1"), "Bacteria", "superkingdom"),
            node("9606", Some("2"), "Homo sapiens", "species"),
        ],
    };

    let first = ingester.ingest(&snapshot).await.unwrap();
    assert!(first.is_some());

    let second = ingester.ingest(&snapshot).await.unwrap();
    assert!(second.is_none());

    let engine = QueryEngine::new(&store);
    let events = engine.get_events(&TaxId::from("9606"), None).await.unwrap();
    assert_eq!(events.len(), 1, "re-ingesting the same path must not duplicate events");
}

#[tokio::test]
async fn moving_a_taxon_changes_both_its_parents_children() {
    let store = EventStore::connect_in_memory().await.unwrap();
    let mut ingester = DifferentialIngester::resume(&store).await.unwrap();

    let snap1 = InMemorySnapshot {
        path: "snap-1".to_string(),
        version_date: date(2020, 1, 1),
        nodes: vec![
            node("1", None, "root", "no rank"),
            node("10", Some("1"), "Family A", "family"),
            node("20", Some("1"), "Family B", "family"),
            node("100", Some("10"), "Genus X", "genus"),
        ],
    };
    ingester.ingest(&snap1).await.unwrap();

    let snap2 = InMemorySnapshot {
        path: "snap-2".to_string(),
        version_date: date(2021, 1, 1),
        nodes: vec![
            node("1", None, "root", "no rank"),
            node("10", Some("1"), "Family A", "family"),
            node("20", Some("1"), "Family B", "family"),
            node("100", Some("20"), "Genus X", "genus"), // moved from 10 to 20
        ],
    };
    ingester.ingest(&snap2).await.unwrap();

    let engine = QueryEngine::new(&store);

    let old_parent_children = engine.get_children(&TaxId::from("10"), None).await.unwrap();
    assert!(old_parent_children.is_empty());

    let new_parent_children = engine.get_children(&TaxId::from("20"), None).await.unwrap();
    assert_eq!(new_parent_children.len(), 1);
    assert_eq!(new_parent_children[0].tax_id, TaxId::from("100"));

    let as_of_before_move = engine
        .get_children(&TaxId::from("10"), Some(date(2020, 6, 1)))
        .await
        .unwrap();
    assert_eq!(as_of_before_move.len(), 1, "historical children should still be visible as-of an earlier date");
}

#[tokio::test]
async fn ingestion_is_idempotent_across_a_resumed_process() {
    let store = EventStore::connect_in_memory().await.unwrap();

    {
        let mut ingester = DifferentialIngester::resume(&store).await.unwrap();
        let snapshot = InMemorySnapshot {
            path: "snap-1".to_string(),
            version_date: date(2020, 1, 1),
            nodes: vec![node("1", None, "root", "no rank")],
        };
        ingester.ingest(&snapshot).await.unwrap();
    }

    // A fresh ingester, as if the process restarted, resumes from the
    // persisted event log rather than from in-memory state.
    {
        let mut ingester = DifferentialIngester::resume(&store).await.unwrap();
        let snapshot = InMemorySnapshot {
            path: "snap-2".to_string(),
            version_date: date(2020, 6, 1),
            nodes: vec![node("1", None, "root", "no rank")],
        };
        let report = ingester.ingest(&snapshot).await.unwrap().unwrap();
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.created, 0);
    }

    let engine = QueryEngine::new(&store);
    let events = engine.get_events(&TaxId::from("1"), None).await.unwrap();
    assert_eq!(events.len(), 1, "an unchanged node across a resume must not produce a spurious event");
}

#[tokio::test]
async fn search_names_finds_a_historical_name_by_prefix() {
    let store = EventStore::connect_in_memory().await.unwrap();
    let mut ingester = DifferentialIngester::resume(&store).await.unwrap();

    let snap1 = InMemorySnapshot {
        path: "snap-1".to_string(),
        version_date: date(2015, 1, 1),
        nodes: vec![node("821", None, "Bacteroides vulgatus", "species")],
    };
    ingester.ingest(&snap1).await.unwrap();

    let snap2 = InMemorySnapshot {
        path: "snap-2".to_string(),
        version_date: date(2021, 1, 1),
        nodes: vec![node("821", None, "Phocaeicola vulgatus", "species")],
    };
    ingester.ingest(&snap2).await.unwrap();

    let engine = QueryEngine::new(&store);
    let hits = engine.search_names("Bacteroides vul", 10).await.unwrap();
    assert!(
        hits.iter().any(|h| h.name == "Bacteroides vulgatus"),
        "search should still surface a name the taxon no longer holds"
    );
}

#[tokio::test]
async fn search_names_tolerates_malformed_fts_syntax() {
    let store = EventStore::connect_in_memory().await.unwrap();
    let mut ingester = DifferentialIngester::resume(&store).await.unwrap();
    ingester
        .ingest(&InMemorySnapshot {
            path: "snap-1".to_string(),
            version_date: date(2020, 1, 1),
            nodes: vec![node("1", None, "root", "no rank")],
        })
        .await
        .unwrap();

    // `search_names` escapes its input before building an FTS5 expression,
    // so it can never hand the parser invalid syntax. Exercise the
    // fallback directly against a hand-built malformed MATCH expression
    // instead, the way a raw query might arrive from another caller.
    let hits = store.fts_search("\"unterminated", 10).await.unwrap();
    assert!(hits.is_empty());
}
