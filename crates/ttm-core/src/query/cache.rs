//! A small bounded result cache in front of the query engine's more
//! expensive recursive operations, `get_lineage` and `get_children`.
//! Queries against historical taxonomy data are answered the same way
//! until new data is ingested, so caching by the exact arguments is safe
//! as long as the cache is invalidated on ingest.

use std::sync::Mutex;

use chrono::NaiveDate;
use lru::LruCache;

use crate::event::{Event, TaxId};

/// Distinguishes cached result sets from different operations that might
/// otherwise share a `(tax_id, as_of)` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Lineage,
    Children,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    operation: Operation,
    tax_id: TaxId,
    as_of: Option<NaiveDate>,
}

/// Thread-safe LRU cache of `Vec<Event>` results keyed on operation, tax id,
/// and `as_of` date.
pub struct QueryCache {
    inner: Mutex<LruCache<CacheKey, Vec<Event>>>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity).unwrap_or(std::num::NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, operation: Operation, tax_id: &TaxId, as_of: Option<NaiveDate>) -> Option<Vec<Event>> {
        let key = CacheKey {
            operation,
            tax_id: tax_id.clone(),
            as_of,
        };
        self.lock().get(&key).cloned()
    }

    pub fn put(&self, operation: Operation, tax_id: &TaxId, as_of: Option<NaiveDate>, value: Vec<Event>) {
        let key = CacheKey {
            operation,
            tax_id: tax_id.clone(),
            as_of,
        };
        self.lock().put(key, value);
    }

    /// Drop all cached results. Called after every ingest, since a single
    /// new event can change the answer to almost any cached query.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// A poisoned cache is still safe to keep using: a panic while a cache
    /// entry was being read or written can't leave the `LruCache` itself in
    /// an inconsistent state worth losing the whole cache over.
    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<CacheKey, Vec<Event>>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = QueryCache::new(8);
        let tax_id = TaxId::from("9606");
        assert!(cache.get(Operation::Lineage, &tax_id, None).is_none());

        cache.put(Operation::Lineage, &tax_id, None, vec![]);
        assert!(cache.get(Operation::Lineage, &tax_id, None).is_some());

        cache.clear();
        assert!(cache.get(Operation::Lineage, &tax_id, None).is_none());
    }

    #[test]
    fn distinct_operations_do_not_collide() {
        let cache = QueryCache::new(8);
        let tax_id = TaxId::from("9606");
        cache.put(Operation::Lineage, &tax_id, None, vec![]);
        assert!(cache.get(Operation::Children, &tax_id, None).is_none());
    }
}
