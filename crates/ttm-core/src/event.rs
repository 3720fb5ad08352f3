//! The event model: the sole persisted record in the event store.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An opaque taxon identifier. Numeric for NCBI, but treated as a text key
/// throughout so non-NCBI taxonomies (name-as-id schemes such as GTDB-Tk)
/// work without a separate code path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxId(String);

impl TaxId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the id is composed entirely of ASCII digits, the heuristic
    /// `search_names` uses to decide whether a query looks like a tax ID.
    pub fn is_numeric(s: &str) -> bool {
        !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for TaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaxId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaxId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl sqlx::Type<sqlx::Sqlite> for TaxId {
    fn type_info() -> <sqlx::Sqlite as sqlx::Database>::TypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TaxId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode(self.0.clone(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TaxId {
    fn decode(
        value: <sqlx::Sqlite as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        <String as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value).map(TaxId)
    }
}

/// The kind of change an event records.
///
/// A historical `Merge` kind from early prototypes is collapsed into `Update`
/// here: a merge is represented as an `Update` that changes a taxon's parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Create,
    Update,
    Delete,
}

impl EventKind {
    /// Storage representation. `Update` is stored as `"alter"` for backward
    /// compatibility with an earlier revision of this event log's format.
    pub fn as_storage_str(self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Update => "alter",
            EventKind::Delete => "delete",
        }
    }

    pub fn from_storage_str(s: &str) -> Option<Self> {
        match s {
            "create" => Some(EventKind::Create),
            "alter" => Some(EventKind::Update),
            "delete" => Some(EventKind::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_storage_str())
    }
}

/// A single taxonomic event: a taxon was created, updated, or deleted at a
/// given snapshot date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Row id in the event log. `None` for an event not yet appended;
    /// `get_children` uses this as the deterministic tie-break when two
    /// events share a `version_date` (higher id wins, i.e. ingested later).
    pub id: Option<i64>,
    pub event_kind: EventKind,
    pub tax_id: TaxId,
    pub version_date: NaiveDate,
    pub name: Option<String>,
    pub rank: Option<String>,
    pub parent_id: Option<TaxId>,
    pub source_id: i64,
}

impl Event {
    /// The `(rank, tax_id, parent_id, name)` signature `get_versions` diffs
    /// consecutive lineages against.
    pub fn lineage_signature(&self) -> (Option<&str>, &str, Option<&str>, Option<&str>) {
        (
            self.rank.as_deref(),
            self.tax_id.as_str(),
            self.parent_id.as_ref().map(TaxId::as_str),
            self.name.as_deref(),
        )
    }
}

/// One row per ingested snapshot; used to detect already-ingested inputs
/// and as the foreign key events reference for provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomySource {
    pub source_id: i64,
    pub path: String,
    pub version_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_detection() {
        assert!(TaxId::is_numeric("9606"));
        assert!(!TaxId::is_numeric("9606a"));
        assert!(!TaxId::is_numeric(""));
    }

    #[test]
    fn event_kind_storage_round_trip() {
        for kind in [EventKind::Create, EventKind::Update, EventKind::Delete] {
            let s = kind.as_storage_str();
            assert_eq!(EventKind::from_storage_str(s), Some(kind));
        }
        assert_eq!(EventKind::Update.as_storage_str(), "alter");
    }

    #[test]
    fn lineage_signature_distinguishes_rename() {
        let base = Event {
            id: Some(1),
            event_kind: EventKind::Update,
            tax_id: TaxId::from("821"),
            version_date: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            name: Some("Bacteroides vulgatus".to_string()),
            rank: Some("species".to_string()),
            parent_id: Some(TaxId::from("816")),
            source_id: 1,
        };
        let renamed = Event {
            name: Some("Phocaeicola vulgatus".to_string()),
            ..base.clone()
        };
        assert_ne!(base.lineage_signature(), renamed.lineage_signature());
    }
}
