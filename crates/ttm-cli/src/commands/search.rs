//! `ttm search <query> [--limit N]`

use comfy_table::Table;
use ttm_core::query::QueryEngine;
use ttm_core::store::EventStore;

use crate::error::Result;

pub async fn run(store: &EventStore, query: &str, limit: usize) -> Result<()> {
    let engine = QueryEngine::new(store);
    let hits = engine.search_names(query, limit).await?;

    let mut table = Table::new();
    table.set_header(vec!["tax_id", "name", "version_date"]);
    for hit in &hits {
        table.add_row(vec![
            hit.tax_id.to_string(),
            hit.name.clone(),
            hit.version_date.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
