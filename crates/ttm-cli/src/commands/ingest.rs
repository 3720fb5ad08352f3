//! `ttm ingest --fixture <path>`

use tracing::info;
use ttm_core::ingest::DifferentialIngester;
use ttm_core::store::EventStore;

use crate::error::Result;
use crate::fixture;

pub async fn run(store: &EventStore, fixture_path: &str) -> Result<()> {
    let snapshot = fixture::load(fixture_path)?;
    let mut ingester = DifferentialIngester::resume(store).await?;

    match ingester.ingest(&snapshot).await? {
        Some(report) => {
            info!(path = snapshot.path, summary = %report.summary(), "ingest complete");
            println!("ingested {}: {}", snapshot.path, report.summary());
        }
        None => {
            println!("{} was already ingested, nothing to do", snapshot.path);
        }
    }
    Ok(())
}
