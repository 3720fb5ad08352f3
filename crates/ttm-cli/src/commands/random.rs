//! `ttm random-species`

use ttm_core::query::QueryEngine;
use ttm_core::store::EventStore;

use crate::error::Result;

pub async fn run(store: &EventStore) -> Result<()> {
    let engine = QueryEngine::new(store);
    match engine.random_species().await? {
        Some(species) => println!(
            "{}\t{}\t{} events",
            species.tax_id, species.name, species.event_count
        ),
        None => println!("no species-rank taxa in the database yet"),
    }
    Ok(())
}
