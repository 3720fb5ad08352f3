//! `ttm events <tax-id> [--as-of DATE]`

use chrono::NaiveDate;
use comfy_table::Table;
use ttm_core::query::QueryEngine;
use ttm_core::store::EventStore;
use ttm_core::TaxId;

use crate::error::Result;

pub async fn run(store: &EventStore, tax_id: &str, as_of: Option<NaiveDate>) -> Result<()> {
    let engine = QueryEngine::new(store);
    let events = engine.get_events(&TaxId::from(tax_id), as_of).await?;

    let mut table = Table::new();
    table.set_header(vec!["version_date", "event", "name", "rank", "parent_id"]);
    for event in &events {
        table.add_row(vec![
            event.version_date.to_string(),
            event.event_kind.to_string(),
            event.name.clone().unwrap_or_default(),
            event.rank.clone().unwrap_or_default(),
            event
                .parent_id
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_default(),
        ]);
    }
    println!("{table}");
    Ok(())
}
