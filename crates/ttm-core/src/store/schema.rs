//! Schema definition and application.
//!
//! Applied imperatively with `IF NOT EXISTS` rather than through
//! `sqlx::migrate!`, since this workspace ships a single, append-only schema
//! with no versioned migrations to track yet.

use sqlx::sqlite::SqlitePool;

use crate::error::{Result, StorageError};

const CREATE_SOURCE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS taxonomy_source (
    source_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    path         TEXT NOT NULL UNIQUE,
    version_date TEXT NOT NULL
)";

const CREATE_EVENT_TABLE: &str = "
CREATE TABLE IF NOT EXISTS event (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    event_kind   TEXT NOT NULL CHECK (event_kind IN ('create', 'alter', 'delete')),
    tax_id       TEXT NOT NULL,
    version_date TEXT NOT NULL,
    name         TEXT,
    rank         TEXT,
    parent_id    TEXT,
    source_id    INTEGER NOT NULL REFERENCES taxonomy_source(source_id)
)";

const CREATE_TAX_ID_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_event_tax_id ON event(tax_id)";
const CREATE_PARENT_ID_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_event_parent_id ON event(parent_id)";
const CREATE_VERSION_DATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_event_version_date ON event(version_date)";
const CREATE_TAX_ID_VERSION_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_event_tax_id_version_date ON event(tax_id, version_date)";
const CREATE_NAME_VERSION_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_event_name_version_date ON event(name, version_date)";
// A case-insensitive index alongside the FTS5 table: FTS handles ranked
// phrase/prefix search, this one backs a plain `WHERE name = ? COLLATE
// NOCASE` lookup without going through the tokenizer.
const CREATE_NAME_NOCASE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_event_name_nocase ON event(name COLLATE NOCASE)";

// `name_fts` carries `tax_id` and `version_date` directly as UNINDEXED
// columns so lookups never rejoin on `name` (which two distinct taxa can
// share). Its rowid is kept in lockstep with `event.id` on insert. This is a
// standalone (not external-content, not contentless) FTS5 table: the
// UNINDEXED columns need to be retrievable by a plain `SELECT`, which a
// contentless (`content=''`) table does not guarantee.
const CREATE_NAME_FTS: &str = "
CREATE VIRTUAL TABLE IF NOT EXISTS name_fts USING fts5(
    name,
    tax_id UNINDEXED,
    version_date UNINDEXED
)";

pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await
        .map_err(StorageError::Sqlx)?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await
        .map_err(StorageError::Sqlx)?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(pool)
        .await
        .map_err(StorageError::Sqlx)?;

    for statement in [
        CREATE_SOURCE_TABLE,
        CREATE_EVENT_TABLE,
        CREATE_TAX_ID_INDEX,
        CREATE_PARENT_ID_INDEX,
        CREATE_VERSION_DATE_INDEX,
        CREATE_TAX_ID_VERSION_INDEX,
        CREATE_NAME_VERSION_INDEX,
        CREATE_NAME_NOCASE_INDEX,
        CREATE_NAME_FTS,
    ] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(StorageError::Sqlx)?;
    }

    Ok(())
}
