//! `ttm lineage <tax-id> [--as-of DATE]`

use chrono::NaiveDate;
use comfy_table::Table;
use ttm_core::query::QueryEngine;
use ttm_core::store::EventStore;
use ttm_core::TaxId;

use crate::error::Result;

pub async fn run(store: &EventStore, tax_id: &str, as_of: Option<NaiveDate>) -> Result<()> {
    let engine = QueryEngine::new(store);
    let lineage = engine.get_lineage(&TaxId::from(tax_id), as_of).await?;

    let mut table = Table::new();
    table.set_header(vec!["tax_id", "name", "rank", "version_date"]);
    for event in &lineage {
        table.add_row(vec![
            event.tax_id.to_string(),
            event.name.clone().unwrap_or_default(),
            event.rank.clone().unwrap_or_default(),
            event.version_date.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
