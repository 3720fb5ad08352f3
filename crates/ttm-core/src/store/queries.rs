//! Raw SQL and row decoding shared by the event store's read paths.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::{Result, StorageError};
use crate::event::{Event, EventKind, TaxId};

pub const EVENTS_BY_TAX_ID: &str = "
SELECT id, event_kind, tax_id, version_date, name, rank, parent_id, source_id
FROM event
WHERE tax_id = ?
ORDER BY version_date ASC, id ASC";

pub const EVENTS_BY_PARENT_ID: &str = "
SELECT id, event_kind, tax_id, version_date, name, rank, parent_id, source_id
FROM event
WHERE parent_id = ?
ORDER BY version_date ASC, id ASC";

pub const EVENTS_BY_TAX_ID_AS_OF: &str = "
SELECT id, event_kind, tax_id, version_date, name, rank, parent_id, source_id
FROM event
WHERE tax_id = ? AND version_date <= ?
ORDER BY version_date ASC, id ASC";

pub const LATEST_EVENT_FOR_TAX_ID: &str = "
SELECT id, event_kind, tax_id, version_date, name, rank, parent_id, source_id
FROM event
WHERE tax_id = ?
ORDER BY version_date DESC, id DESC
LIMIT 1";

pub const LATEST_EVENT_FOR_TAX_ID_AS_OF: &str = "
SELECT id, event_kind, tax_id, version_date, name, rank, parent_id, source_id
FROM event
WHERE tax_id = ? AND version_date <= ?
ORDER BY version_date DESC, id DESC
LIMIT 1";

/// One row per distinct `tax_id`: its most recent event, excluding tax ids
/// whose most recent event is a `delete`. This is the `last_state` map the
/// differential ingester reconstructs on startup.
pub const MOST_RECENT_EVENTS_EXCLUDING_DELETED: &str = "
SELECT e.id, e.event_kind, e.tax_id, e.version_date, e.name, e.rank, e.parent_id, e.source_id
FROM event e
INNER JOIN (
    SELECT tax_id, MAX(version_date) AS max_date
    FROM event
    GROUP BY tax_id
) latest ON e.tax_id = latest.tax_id AND e.version_date = latest.max_date
WHERE e.id = (
    SELECT id FROM event e2
    WHERE e2.tax_id = e.tax_id AND e2.version_date = latest.max_date
    ORDER BY id DESC LIMIT 1
)
AND e.event_kind != 'delete'";

pub fn row_to_event(row: &SqliteRow) -> Result<Event> {
    let kind_str: String = row.try_get("event_kind").map_err(StorageError::Sqlx)?;
    let event_kind = EventKind::from_storage_str(&kind_str)
        .ok_or_else(|| StorageError::config(format!("unknown event_kind in storage: {kind_str}")))?;

    let version_date_str: String = row.try_get("version_date").map_err(StorageError::Sqlx)?;
    let version_date: NaiveDate = version_date_str
        .parse()
        .map_err(|_| StorageError::config(format!("corrupt version_date: {version_date_str}")))?;

    let tax_id: String = row.try_get("tax_id").map_err(StorageError::Sqlx)?;
    let parent_id: Option<String> = row.try_get("parent_id").map_err(StorageError::Sqlx)?;

    Ok(Event {
        id: row.try_get("id").map_err(StorageError::Sqlx)?,
        event_kind,
        tax_id: TaxId::from(tax_id),
        version_date,
        name: row.try_get("name").map_err(StorageError::Sqlx)?,
        rank: row.try_get("rank").map_err(StorageError::Sqlx)?,
        parent_id: parent_id.map(TaxId::from),
        source_id: row.try_get("source_id").map_err(StorageError::Sqlx)?,
    })
}
