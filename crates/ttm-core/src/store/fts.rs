//! Full-text search over taxon names via the `name_fts` FTS5 virtual table.

use chrono::NaiveDate;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::error::{Result, StorageError};
use crate::event::TaxId;

/// Quote a literal string for use inside an FTS5 MATCH expression, doubling
/// embedded quotes, so names containing quotes or FTS5 operators (`AND`,
/// `OR`, `-`) are treated as literal text rather than query syntax.
pub fn escape_fts_phrase(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Run an FTS5 MATCH query. FTS5 syntax errors are reported as `Ok(vec![])`
/// rather than propagated, since a malformed user-supplied search string is
/// not a storage failure — it simply has no results.
pub async fn run_query(
    pool: &SqlitePool,
    match_expr: &str,
    limit: i64,
) -> Result<Vec<(TaxId, String, NaiveDate)>> {
    let result = sqlx::query(
        "SELECT tax_id, name, version_date, bm25(name_fts) AS score
         FROM name_fts
         WHERE name_fts MATCH ?
         ORDER BY score
         LIMIT ?",
    )
    .bind(match_expr)
    .bind(limit)
    .fetch_all(pool)
    .await;

    let rows = match result {
        Ok(rows) => rows,
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("fts5: syntax error") => {
            tracing::debug!(query = %match_expr, "fts5 rejected malformed query, returning no matches");
            return Ok(Vec::new());
        }
        Err(e) => return Err(StorageError::Sqlx(e).into()),
    };

    rows.iter()
        .map(|row| {
            let tax_id: String = row.try_get("tax_id").map_err(StorageError::Sqlx)?;
            let name: String = row.try_get("name").map_err(StorageError::Sqlx)?;
            let version_date_str: String = row.try_get("version_date").map_err(StorageError::Sqlx)?;
            let version_date = version_date_str
                .parse()
                .map_err(|_| StorageError::config(format!("corrupt version_date: {version_date_str}")))?;
            Ok((TaxId::from(tax_id), name, version_date))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_embedded_quotes() {
        assert_eq!(escape_fts_phrase("Bob's species"), "\"Bob's species\"");
        assert_eq!(escape_fts_phrase("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
