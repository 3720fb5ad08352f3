//! The event store: an append-only log of taxonomy events backed by SQLite.

mod fts;
mod queries;
mod schema;

pub use fts::escape_fts_phrase;

use std::time::Duration;

use chrono::NaiveDate;
use rand::Rng;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::error::{CoreError, Result, StorageError};
use crate::event::{Event, EventKind, TaxId};

/// Connection pool and schema configuration for the event store.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    /// Create the database file and apply the schema if it does not exist.
    pub create_if_missing: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: "taxonomy_time_machine.db".to_string(),
            max_connections: 5,
            connect_timeout_secs: 30,
            create_if_missing: true,
        }
    }
}

impl DbConfig {
    /// Load configuration from `DATABASE_PATH` and optional tuning knobs.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("DATABASE_PATH")
            .map_err(|_| StorageError::config("DATABASE_PATH not set"))?;

        let max_connections = std::env::var("TTM_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let connect_timeout_secs = std::env::var("TTM_DB_CONNECT_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            path,
            max_connections,
            connect_timeout_secs,
            create_if_missing: true,
        })
    }
}

/// Handle to the event store. Cheap to clone; wraps a pooled connection.
#[derive(Debug, Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    /// Open (and, if necessary, create and migrate) the database at `config.path`.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(config.create_if_missing)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(options)
            .await
            .map_err(StorageError::Sqlx)?;

        schema::apply(&pool).await?;

        tracing::info!(path = %config.path, "event store opened");
        Ok(Self { pool })
    }

    /// Open an in-memory database, primarily for tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(StorageError::Sqlx)?;
        schema::apply(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| CoreError::Storage(StorageError::Sqlx(e)))
    }

    /// True if a source at this path has already been registered.
    pub async fn snapshot_seen(&self, path: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM taxonomy_source WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        Ok(row.is_some())
    }

    /// Register a new snapshot source and return its id.
    pub async fn register_snapshot(&self, path: &str, version_date: NaiveDate) -> Result<i64> {
        let result = sqlx::query("INSERT INTO taxonomy_source (path, version_date) VALUES (?, ?)")
            .bind(path)
            .bind(version_date.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        Ok(result.last_insert_rowid())
    }

    /// Append a batch of events within a single transaction. Ingestion is the
    /// only writer, so a single all-or-nothing transaction per batch is
    /// enough; there's no partial-failure case to isolate row-by-row.
    pub async fn append_events(&self, events: &[Event]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;
        for event in events {
            sqlx::query(
                "INSERT INTO event (event_kind, tax_id, version_date, name, rank, parent_id, source_id)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(event.event_kind.as_storage_str())
            .bind(event.tax_id.as_str())
            .bind(event.version_date.to_string())
            .bind(&event.name)
            .bind(&event.rank)
            .bind(event.parent_id.as_ref().map(TaxId::as_str))
            .bind(event.source_id)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::Sqlx)?;

            sqlx::query(
                "INSERT INTO name_fts (rowid, name, tax_id, version_date) VALUES (last_insert_rowid(), ?, ?, ?)",
            )
            .bind(&event.name)
            .bind(event.tax_id.as_str())
            .bind(event.version_date.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::Sqlx)?;
        }
        tx.commit().await.map_err(StorageError::Sqlx)?;

        tracing::debug!(count = events.len(), "appended events");
        Ok(())
    }

    /// All events for a given tax id, ascending by version date.
    pub async fn events_by_tax_id(&self, tax_id: &TaxId) -> Result<Vec<Event>> {
        let rows = sqlx::query(queries::EVENTS_BY_TAX_ID)
            .bind(tax_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        rows.iter().map(queries::row_to_event).collect()
    }

    /// All events whose `parent_id` matches, ascending by version date.
    pub async fn events_by_parent_id(&self, parent_id: &TaxId) -> Result<Vec<Event>> {
        let rows = sqlx::query(queries::EVENTS_BY_PARENT_ID)
            .bind(parent_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        rows.iter().map(queries::row_to_event).collect()
    }

    /// Every event recorded up to and including `as_of`, for a tax id.
    pub async fn events_by_tax_id_as_of(&self, tax_id: &TaxId, as_of: NaiveDate) -> Result<Vec<Event>> {
        let rows = sqlx::query(queries::EVENTS_BY_TAX_ID_AS_OF)
            .bind(tax_id.as_str())
            .bind(as_of.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        rows.iter().map(queries::row_to_event).collect()
    }

    /// Reconstruct the most-recent non-deleted event per tax id, the
    /// `last_state` map the differential ingester resumes from.
    pub async fn iter_most_recent_events(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query(queries::MOST_RECENT_EVENTS_EXCLUDING_DELETED)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        rows.iter().map(queries::row_to_event).collect()
    }

    /// Exact tax-id lookup path of `search_names`: the event with the
    /// largest `version_date` (i.e. most recent) for this id, of any kind.
    pub async fn latest_event_for_tax_id(&self, tax_id: &TaxId) -> Result<Option<Event>> {
        let row = sqlx::query(queries::LATEST_EVENT_FOR_TAX_ID)
            .bind(tax_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        row.as_ref().map(queries::row_to_event).transpose()
    }

    /// The most recent event for a tax id as of a given date, of any kind.
    /// The workhorse behind `get_lineage`'s ancestor walk.
    pub async fn latest_event_for_tax_id_as_of(
        &self,
        tax_id: &TaxId,
        as_of: NaiveDate,
    ) -> Result<Option<Event>> {
        let row = sqlx::query(queries::LATEST_EVENT_FOR_TAX_ID_AS_OF)
            .bind(tax_id.as_str())
            .bind(as_of.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;
        row.as_ref().map(queries::row_to_event).transpose()
    }

    /// Full-text search over taxon names via the `name_fts` virtual table.
    /// Returns `(tax_id, name, version_date)` triples; malformed FTS5 query
    /// syntax is reported as `Ok(vec![])` by the caller layer, not here —
    /// see `fts::run_query`.
    pub async fn fts_search(&self, match_expr: &str, limit: i64) -> Result<Vec<(TaxId, String, NaiveDate)>> {
        fts::run_query(&self.pool, match_expr, limit).await
    }

    /// A uniformly random row with `rank = 'species'`, for the "surprise me"
    /// entry point, paired with the total number of events on record for
    /// that tax id. Does not filter to currently-alive taxa, matching the
    /// original tool's documented behavior.
    pub async fn random_species(&self) -> Result<Option<(Event, i64)>> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM event WHERE rank = 'species' AND event_kind != 'delete'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if count == 0 {
            return Ok(None);
        }

        // SQLite has no portable random-offset primitive at the query level
        // that avoids a full scan either way, so pick an offset in process
        // and let SQLite seek to it.
        let offset = rand::rng().random_range(0..count);
        let row = sqlx::query(
            "SELECT id, event_kind, tax_id, version_date, name, rank, parent_id, source_id
             FROM event WHERE rank = 'species' AND event_kind != 'delete'
             ORDER BY id LIMIT 1 OFFSET ?",
        )
        .bind(offset)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        let Some(event) = row.as_ref().map(queries::row_to_event).transpose()? else {
            return Ok(None);
        };

        let event_count = self.event_count_for_tax_id(&event.tax_id).await?;
        Ok(Some((event, event_count)))
    }

    /// Total number of events on record for a tax id, of any kind.
    pub async fn event_count_for_tax_id(&self, tax_id: &TaxId) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM event WHERE tax_id = ?")
            .bind(tax_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Sqlx(e).into())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_in_memory_applies_schema() {
        let store = EventStore::connect_in_memory().await.unwrap();
        store.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn snapshot_registration_round_trips() {
        let store = EventStore::connect_in_memory().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(!store.snapshot_seen("taxdump_2020-01-01.tar.gz").await.unwrap());

        let id = store
            .register_snapshot("taxdump_2020-01-01.tar.gz", date)
            .await
            .unwrap();
        assert!(id > 0);
        assert!(store.snapshot_seen("taxdump_2020-01-01.tar.gz").await.unwrap());
    }

    #[tokio::test]
    async fn append_and_fetch_events() {
        let store = EventStore::connect_in_memory().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let source_id = store.register_snapshot("snap-1", date).await.unwrap();

        let event = Event {
            id: None,
            event_kind: EventKind::Create,
            tax_id: TaxId::from("9606"),
            version_date: date,
            name: Some("Homo sapiens".to_string()),
            rank: Some("species".to_string()),
            parent_id: Some(TaxId::from("9605")),
            source_id,
        };
        store.append_events(std::slice::from_ref(&event)).await.unwrap();

        let fetched = store.events_by_tax_id(&TaxId::from("9606")).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].name.as_deref(), Some("Homo sapiens"));

        let children = store.events_by_parent_id(&TaxId::from("9605")).await.unwrap();
        assert_eq!(children.len(), 1);
    }

    #[tokio::test]
    async fn most_recent_events_excludes_deleted() {
        let store = EventStore::connect_in_memory().await.unwrap();
        let d1 = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap();
        let source_id = store.register_snapshot("snap-1", d1).await.unwrap();

        store
            .append_events(&[Event {
                id: None,
                event_kind: EventKind::Create,
                tax_id: TaxId::from("1"),
                version_date: d1,
                name: Some("A".to_string()),
                rank: None,
                parent_id: None,
                source_id,
            }])
            .await
            .unwrap();

        let source_id_2 = store.register_snapshot("snap-2", d2).await.unwrap();
        store
            .append_events(&[Event {
                id: None,
                event_kind: EventKind::Delete,
                tax_id: TaxId::from("1"),
                version_date: d2,
                name: None,
                rank: None,
                parent_id: None,
                source_id: source_id_2,
            }])
            .await
            .unwrap();

        let state = store.iter_most_recent_events().await.unwrap();
        assert!(state.is_empty());
    }
}
