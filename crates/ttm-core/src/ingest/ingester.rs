//! Differential ingestion: turn a full taxonomy snapshot into the minimal
//! set of Create/Update/Delete events relative to the last known state.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::error::{IngestError, Result};
use crate::event::{Event, EventKind, TaxId};
use crate::ingest::snapshot::{SnapshotNode, SnapshotSource};
use crate::store::EventStore;

/// Number of events appended per transaction. Matches the batch size the
/// original loader used for its `executemany` calls — large enough to
/// amortize transaction overhead, small enough to keep memory bounded on a
/// several-million-node snapshot.
const BATCH_SIZE: usize = 10_000;

/// The last known (name, rank, parent_id) for a tax id, used to decide
/// whether a node in a new snapshot is new, changed, or unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LastNode {
    name: String,
    rank: Option<String>,
    parent_id: Option<TaxId>,
}

impl From<&SnapshotNode> for LastNode {
    fn from(n: &SnapshotNode) -> Self {
        Self {
            name: n.name.clone(),
            rank: n.rank.clone(),
            parent_id: n.parent_id.clone(),
        }
    }
}

/// Outcome of ingesting one snapshot.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl IngestReport {
    pub fn total_events(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    pub fn summary(&self) -> String {
        format!(
            "{} created, {} updated, {} deleted, {} unchanged",
            self.created, self.updated, self.deleted, self.unchanged
        )
    }
}

/// Stateful ingester: holds the reconstructed last-known-state map across
/// calls to `ingest`, so a caller can feed it a series of snapshots without
/// re-reading the whole event log between each one.
pub struct DifferentialIngester<'a> {
    store: &'a EventStore,
    last_state: HashMap<TaxId, LastNode>,
}

impl<'a> DifferentialIngester<'a> {
    /// Reconstruct `last_state` from the event log. Tax ids whose most
    /// recent event is a delete are excluded: the ingester must treat
    /// their reappearance in a later snapshot as a `Create`, exactly as it
    /// would if it had never restarted.
    pub async fn resume(store: &'a EventStore) -> Result<Self> {
        let events = store.iter_most_recent_events().await?;
        let mut last_state = HashMap::with_capacity(events.len());
        for event in events {
            last_state.insert(
                event.tax_id.clone(),
                LastNode {
                    name: event.name.unwrap_or_default(),
                    rank: event.rank,
                    parent_id: event.parent_id,
                },
            );
        }
        info!(known_taxa = last_state.len(), "ingester resumed");
        Ok(Self { store, last_state })
    }

    /// Diff `snapshot` against the current state and append the resulting
    /// events. Returns `Ok(None)` if this snapshot's path was already
    /// ingested rather than erroring, since re-running ingestion over
    /// an already-seen path is the common, expected case for a cron job.
    pub async fn ingest(&mut self, snapshot: &dyn SnapshotSource) -> Result<Option<IngestReport>> {
        if self.store.snapshot_seen(snapshot.path()).await? {
            debug!(path = snapshot.path(), "snapshot already ingested, skipping");
            return Ok(None);
        }

        let source_id = self
            .store
            .register_snapshot(snapshot.path(), snapshot.version_date())
            .await?;

        let mut report = IngestReport::default();
        let mut pending: Vec<Event> = Vec::new();
        let mut seen_tax_ids: HashSet<TaxId> = HashSet::with_capacity(snapshot.nodes().len());

        for node in snapshot.nodes() {
            if node.name.is_empty() {
                return Err(IngestError::MalformedEntry(format!(
                    "tax id {} has an empty name",
                    node.tax_id
                ))
                .into());
            }
            seen_tax_ids.insert(node.tax_id.clone());

            let incoming = LastNode::from(node);
            match self.last_state.get(&node.tax_id) {
                None => {
                    pending.push(make_event(
                        EventKind::Create,
                        node,
                        snapshot.version_date(),
                        source_id,
                    ));
                    report.created += 1;
                }
                Some(existing) if *existing != incoming => {
                    pending.push(make_event(
                        EventKind::Update,
                        node,
                        snapshot.version_date(),
                        source_id,
                    ));
                    report.updated += 1;
                }
                Some(_) => {
                    report.unchanged += 1;
                }
            }
            self.last_state.insert(node.tax_id.clone(), incoming);

            if pending.len() >= BATCH_SIZE {
                self.store.append_events(&pending).await?;
                pending.clear();
            }
        }

        let deleted_ids: Vec<TaxId> = self
            .last_state
            .keys()
            .filter(|id| !seen_tax_ids.contains(*id))
            .cloned()
            .collect();

        for tax_id in &deleted_ids {
            // The parent as last known, not `None`: a later lineage walk through
            // this deleted node should still be able to continue past it.
            let parent_id = self.last_state.get(tax_id).and_then(|n| n.parent_id.clone());
            pending.push(Event {
                id: None,
                event_kind: EventKind::Delete,
                tax_id: tax_id.clone(),
                version_date: snapshot.version_date(),
                name: None,
                rank: None,
                parent_id,
                source_id,
            });
            // Removed, not merely marked: a later re-creation of this tax id
            // must be seen as a fresh `Create`, not a no-op or `Update`.
            self.last_state.remove(tax_id);
        }
        report.deleted = deleted_ids.len();

        if !pending.is_empty() {
            self.store.append_events(&pending).await?;
        }

        info!(path = snapshot.path(), summary = %report.summary(), "ingested snapshot");
        Ok(Some(report))
    }
}

fn make_event(
    kind: EventKind,
    node: &SnapshotNode,
    version_date: chrono::NaiveDate,
    source_id: i64,
) -> Event {
    Event {
        id: None,
        event_kind: kind,
        tax_id: node.tax_id.clone(),
        version_date,
        name: Some(node.name.clone()),
        rank: node.rank.clone(),
        parent_id: node.parent_id.clone(),
        source_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::snapshot::InMemorySnapshot;
    use chrono::NaiveDate;

    fn node(tax_id: &str, parent: Option<&str>, name: &str, rank: &str) -> SnapshotNode {
        SnapshotNode {
            tax_id: TaxId::from(tax_id),
            parent_id: parent.map(TaxId::from),
            name: name.to_string(),
            rank: Some(rank.to_string()),
        }
    }

    #[tokio::test]
    async fn first_snapshot_creates_everything() {
        let store = EventStore::connect_in_memory().await.unwrap();
        let mut ingester = DifferentialIngester::resume(&store).await.unwrap();

        let snap = InMemorySnapshot {
            path: "snap-1".to_string(),
            version_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            nodes: vec![
                node("1", None, "root", "no rank"),
                node("2", Some("1"), "Bacteria", "superkingdom"),
            ],
        };
        let report = ingester.ingest(&snap).await.unwrap().unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.updated, 0);
        assert_eq!(report.deleted, 0);
    }

    #[tokio::test]
    async fn second_identical_snapshot_changes_nothing() {
        let store = EventStore::connect_in_memory().await.unwrap();
        let mut ingester = DifferentialIngester::resume(&store).await.unwrap();

        let nodes = vec![node("1", None, "root", "no rank")];
        let snap1 = InMemorySnapshot {
            path: "snap-1".to_string(),
            version_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            nodes: nodes.clone(),
        };
        ingester.ingest(&snap1).await.unwrap();

        let snap2 = InMemorySnapshot {
            path: "snap-2".to_string(),
            version_date: NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
            nodes,
        };
        let report = ingester.ingest(&snap2).await.unwrap().unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.updated, 0);
        assert_eq!(report.unchanged, 1);
    }

    #[tokio::test]
    async fn already_ingested_path_is_skipped() {
        let store = EventStore::connect_in_memory().await.unwrap();
        let mut ingester = DifferentialIngester::resume(&store).await.unwrap();

        let snap = InMemorySnapshot {
            path: "snap-1".to_string(),
            version_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            nodes: vec![node("1", None, "root", "no rank")],
        };
        assert!(ingester.ingest(&snap).await.unwrap().is_some());
        assert!(ingester.ingest(&snap).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rename_produces_an_update_not_a_create() {
        let store = EventStore::connect_in_memory().await.unwrap();
        let mut ingester = DifferentialIngester::resume(&store).await.unwrap();

        let snap1 = InMemorySnapshot {
            path: "snap-1".to_string(),
            version_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            nodes: vec![node("821", Some("816"), "Bacteroides vulgatus", "species")],
        };
        ingester.ingest(&snap1).await.unwrap();

        let snap2 = InMemorySnapshot {
            path: "snap-2".to_string(),
            version_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            nodes: vec![node("821", Some("816"), "Phocaeicola vulgatus", "species")],
        };
        let report = ingester.ingest(&snap2).await.unwrap().unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.created, 0);
    }

    #[tokio::test]
    async fn deletion_then_recreation_emits_delete_then_create() {
        let store = EventStore::connect_in_memory().await.unwrap();
        let mut ingester = DifferentialIngester::resume(&store).await.unwrap();

        let snap1 = InMemorySnapshot {
            path: "snap-1".to_string(),
            version_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            nodes: vec![node("42", None, "Temp", "no rank")],
        };
        ingester.ingest(&snap1).await.unwrap();

        let snap2 = InMemorySnapshot {
            path: "snap-2".to_string(),
            version_date: NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
            nodes: vec![],
        };
        let report2 = ingester.ingest(&snap2).await.unwrap().unwrap();
        assert_eq!(report2.deleted, 1);

        let snap3 = InMemorySnapshot {
            path: "snap-3".to_string(),
            version_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            nodes: vec![node("42", None, "Temp", "no rank")],
        };
        let report3 = ingester.ingest(&snap3).await.unwrap().unwrap();
        assert_eq!(report3.created, 1);
    }
}
