//! `ttm versions <tax-id> [--as-of DATE]`

use chrono::NaiveDate;
use comfy_table::Table;
use ttm_core::query::QueryEngine;
use ttm_core::store::EventStore;
use ttm_core::TaxId;

use crate::error::Result;

pub async fn run(store: &EventStore, tax_id: &str, as_of: Option<NaiveDate>) -> Result<()> {
    let engine = QueryEngine::new(store);
    let versions = engine.get_versions(&TaxId::from(tax_id), as_of).await?;

    let mut table = Table::new();
    table.set_header(vec!["version_date", "name", "rank", "parent_id"]);
    for version in &versions {
        let Some(own) = version.lineage.first() else {
            continue;
        };
        table.add_row(vec![
            version.version_date.to_string(),
            own.name.clone().unwrap_or_default(),
            own.rank.clone().unwrap_or_default(),
            own.parent_id.as_ref().map(|p| p.to_string()).unwrap_or_default(),
        ]);
    }
    println!("{table}");
    Ok(())
}
