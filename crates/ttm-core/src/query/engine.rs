//! Temporal queries over the event log: point-in-time lineages, children,
//! version history, and name search.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::error::{CoreError, Result};
use crate::event::{Event, EventKind, TaxId};
use crate::query::cache::{Operation, QueryCache};
use crate::store::{escape_fts_phrase, EventStore};

/// Recursive traversals (`get_lineage`, `get_versions`) stop here rather
/// than loop forever on a malformed or cyclic parent chain.
pub const MAX_TRAVERSAL_DEPTH: usize = 100;

/// One entry in a taxon's version history: the lineage as it stood as of
/// `version_date`, emitted only when it differs from the previous entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    pub version_date: NaiveDate,
    pub lineage: Vec<Event>,
}

/// A name search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub tax_id: TaxId,
    pub name: String,
    pub version_date: NaiveDate,
}

/// A uniformly chosen species-rank taxon, for the "surprise me" entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomSpecies {
    pub tax_id: TaxId,
    pub name: String,
    pub event_count: i64,
}

/// The query engine: an `EventStore` plus an optional result cache in front
/// of the expensive recursive operations.
pub struct QueryEngine<'a> {
    store: &'a EventStore,
    cache: Option<&'a QueryCache>,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a EventStore) -> Self {
        Self { store, cache: None }
    }

    pub fn with_cache(store: &'a EventStore, cache: &'a QueryCache) -> Self {
        Self {
            store,
            cache: Some(cache),
        }
    }

    /// Raw events for a tax id, optionally filtered to `version_date <= as_of`.
    pub async fn get_events(&self, tax_id: &TaxId, as_of: Option<NaiveDate>) -> Result<Vec<Event>> {
        match as_of {
            Some(date) => self.store.events_by_tax_id_as_of(tax_id, date).await,
            None => self.store.events_by_tax_id(tax_id).await,
        }
    }

    /// Events recorded against children that once or currently point at
    /// `parent_id`, filtered the same way as `get_events`.
    pub async fn get_events_by_parent(
        &self,
        parent_id: &TaxId,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<Event>> {
        let events = self.store.events_by_parent_id(parent_id).await?;
        Ok(match as_of {
            Some(date) => events.into_iter().filter(|e| e.version_date <= date).collect(),
            None => events,
        })
    }

    /// Walk the ancestor chain from `tax_id` up to the root, as it stood
    /// `as_of` a given date (or the present, if `None`). Each step scans
    /// that taxon's events in reverse (most recent first) for the first one
    /// with a non-null `parent_id` — not simply the latest event outright —
    /// so that a `Delete` (whose `parent_id` is typically null) doesn't cut
    /// the lineage off: an older `Create`/`Update` still pins where the walk
    /// continues. The walk stops at a taxon with no such event, or at one
    /// whose pinning event has a null parent (the root).
    pub async fn get_lineage(&self, tax_id: &TaxId, as_of: Option<NaiveDate>) -> Result<Vec<Event>> {
        if let Some(cache) = self.cache {
            if let Some(hit) = cache.get(Operation::Lineage, tax_id, as_of) {
                return Ok(hit);
            }
        }

        let lineage = self.walk_lineage(tax_id, as_of).await?;

        if let Some(cache) = self.cache {
            cache.put(Operation::Lineage, tax_id, as_of, lineage.clone());
        }
        Ok(lineage)
    }

    async fn walk_lineage(&self, tax_id: &TaxId, as_of: Option<NaiveDate>) -> Result<Vec<Event>> {
        let mut lineage = Vec::new();
        let mut current = tax_id.clone();
        let mut visited = HashSet::new();

        for _ in 0..MAX_TRAVERSAL_DEPTH {
            if !visited.insert(current.clone()) {
                break; // cycle in the parent chain; stop rather than loop forever
            }

            let events = self.get_events(&current, as_of).await?;
            let pinning_event = events.into_iter().rev().find(|e| e.parent_id.is_some());

            let Some(event) = pinning_event else {
                break;
            };

            let next_parent = event.parent_id.clone();
            lineage.push(event);

            match next_parent {
                Some(parent) => current = parent,
                None => break, // unreachable: pinning_event was filtered to parent_id.is_some()
            }
        }

        Ok(lineage)
    }

    /// Direct children of `tax_id` as of a given date: taxa whose most
    /// recent event points at `tax_id` as parent and is not a delete. A
    /// child that was moved away or deleted after last pointing here is
    /// excluded even though its history contains an event with this parent.
    pub async fn get_children(&self, tax_id: &TaxId, as_of: Option<NaiveDate>) -> Result<Vec<Event>> {
        if let Some(cache) = self.cache {
            if let Some(hit) = cache.get(Operation::Children, tax_id, as_of) {
                return Ok(hit);
            }
        }

        let parent_events = self.get_events_by_parent(tax_id, as_of).await?;
        let candidate_ids: HashSet<TaxId> = parent_events.iter().map(|e| e.tax_id.clone()).collect();

        let mut latest_by_tax_id: HashMap<TaxId, Event> = HashMap::with_capacity(candidate_ids.len());
        for candidate in candidate_ids {
            let latest = match as_of {
                Some(date) => self.store.latest_event_for_tax_id_as_of(&candidate, date).await?,
                None => self.store.latest_event_for_tax_id(&candidate).await?,
            };
            if let Some(latest) = latest {
                latest_by_tax_id.insert(candidate, latest);
            }
        }

        let mut children: Vec<Event> = latest_by_tax_id
            .into_values()
            .filter(|e| e.event_kind != EventKind::Delete && e.parent_id.as_ref() == Some(tax_id))
            .collect();
        // Deterministic ordering: ascending version_date, ties broken by id.
        children.sort_by(|a, b| a.version_date.cmp(&b.version_date).then(a.id.cmp(&b.id)));

        if let Some(cache) = self.cache {
            cache.put(Operation::Children, tax_id, as_of, children.clone());
        }
        Ok(children)
    }

    /// The history of distinct lineages this taxon has held, collapsing
    /// consecutive dates whose lineage signature is unchanged. A new entry
    /// can be produced either by a change to the taxon's own record or to
    /// one of its ancestors.
    pub async fn get_versions(&self, tax_id: &TaxId, as_of: Option<NaiveDate>) -> Result<Vec<VersionEntry>> {
        // Each entry's lineage can span several events, which doesn't fit
        // the flat `Vec<Event>` shape `QueryCache` holds for the other two
        // operations, so this one is computed fresh on every call.
        let all_events = self.collect_reachable_events(tax_id).await?;
        let mut dates: Vec<NaiveDate> = all_events.iter().map(|e| e.version_date).collect();
        dates.sort();
        dates.dedup();
        if let Some(cutoff) = as_of {
            dates.retain(|d| *d <= cutoff);
        }

        let mut entries = Vec::new();
        let mut previous_signature: Option<Vec<(Option<String>, String, Option<String>, Option<String>)>> = None;

        for date in dates {
            let lineage = self.walk_lineage(tax_id, Some(date)).await?;
            if lineage.is_empty() {
                continue; // not yet created, or already deleted, as of this date
            }
            let signature: Vec<_> = lineage
                .iter()
                .map(|e| {
                    let (rank, id, parent, name) = e.lineage_signature();
                    (
                        rank.map(str::to_string),
                        id.to_string(),
                        parent.map(str::to_string),
                        name.map(str::to_string),
                    )
                })
                .collect();

            if previous_signature.as_ref() != Some(&signature) {
                entries.push(VersionEntry {
                    version_date: date,
                    lineage,
                });
                previous_signature = Some(signature);
            }
        }

        Ok(entries)
    }

    /// DFS over the tax id's own events and, transitively, every parent id
    /// any of those events has ever named, guarded against cycles. This is
    /// the set of taxa whose history can affect `tax_id`'s lineage string.
    async fn collect_reachable_events(&self, tax_id: &TaxId) -> Result<Vec<Event>> {
        let mut collected = Vec::new();
        let mut seen: HashSet<TaxId> = HashSet::new();
        let mut frontier = vec![tax_id.clone()];

        while let Some(current) = frontier.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if seen.len() > MAX_TRAVERSAL_DEPTH {
                return Err(CoreError::DepthLimitExceeded(MAX_TRAVERSAL_DEPTH));
            }

            let events = self.store.events_by_tax_id(&current).await?;
            for event in &events {
                if let Some(parent) = &event.parent_id {
                    if !seen.contains(parent) {
                        frontier.push(parent.clone());
                    }
                }
            }
            collected.extend(events);
        }

        Ok(collected)
    }

    /// Search taxon names: an exact numeric tax id lookup, then an FTS5
    /// prefix query, then an FTS5 phrase query, de-duplicated by name
    /// (keeping the most recent `version_date` for each) and sorted with
    /// shorter names first.
    pub async fn search_names(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        // The exact tax-id match, if any, always leads the result — it is
        // not subject to the length sort applied to the FTS hits below.
        let mut exact_match: Option<SearchHit> = None;
        if TaxId::is_numeric(query) {
            if let Some(event) = self.store.latest_event_for_tax_id(&TaxId::from(query)).await? {
                if event.event_kind != EventKind::Delete {
                    if let Some(name) = event.name {
                        exact_match = Some(SearchHit {
                            tax_id: event.tax_id,
                            name,
                            version_date: event.version_date,
                        });
                    }
                }
            }
        }

        let prefix_query = format!("{}*", escape_fts_phrase(query));
        let prefix_hits = self.store.fts_search(&prefix_query, limit as i64 * 4).await?;

        let phrase_query = escape_fts_phrase(query);
        let phrase_hits = self.store.fts_search(&phrase_query, limit as i64 * 4).await?;

        let mut fts_hits: Vec<SearchHit> = Vec::new();
        for (tax_id, name, version_date) in prefix_hits.into_iter().chain(phrase_hits) {
            fts_hits.push(SearchHit {
                tax_id,
                name,
                version_date,
            });
        }

        // Dedupe by name, keeping the most recent version_date seen for it.
        let mut by_name: HashMap<String, SearchHit> = HashMap::new();
        for hit in fts_hits {
            by_name
                .entry(hit.name.clone())
                .and_modify(|existing| {
                    if hit.version_date > existing.version_date {
                        *existing = hit.clone();
                    }
                })
                .or_insert(hit);
        }

        let mut deduped: Vec<SearchHit> = by_name.into_values().collect();
        deduped.sort_by_key(|h| h.name.len());

        let mut results = Vec::with_capacity(limit);
        if let Some(exact) = exact_match {
            deduped.retain(|h| h.name != exact.name);
            results.push(exact);
        }
        results.extend(deduped);
        results.truncate(limit);
        Ok(results)
    }

    /// A uniformly random species-rank taxon, for the "surprise me" entry
    /// point. Does not filter to currently-alive taxa.
    pub async fn random_species(&self) -> Result<Option<RandomSpecies>> {
        let Some((event, event_count)) = self.store.random_species().await? else {
            return Ok(None);
        };
        Ok(Some(RandomSpecies {
            tax_id: event.tax_id,
            name: event.name.unwrap_or_default(),
            event_count,
        }))
    }
}
