//! Taxonomy Time Machine CLI - Main entry point

use std::process;

use clap::Parser;
use tracing::error;
use ttm_cli::{commands, config::Config, Cli, Commands};
use ttm_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use ttm_core::store::EventStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env().unwrap_or_default();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
        log_config.output = LogOutput::Console;
    }
    let _ = init_logging(&log_config);

    if let Err(e) = run(&cli).await {
        error!(error = %e, "command failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(cli: &Cli) -> ttm_cli::Result<()> {
    let Some(ref command) = cli.command else {
        eprintln!("Error: a subcommand is required");
        process::exit(2);
    };

    let mut config = Config::from_env()?;
    if let Some(ref path) = cli.database_path {
        config.database_path = path.clone();
    }

    let store = EventStore::connect(&config.db_config()).await?;

    match command {
        Commands::Ingest { fixture } => commands::ingest::run(&store, fixture).await,
        Commands::Events { tax_id, as_of } => commands::events::run(&store, tax_id, *as_of).await,
        Commands::Lineage { tax_id, as_of } => commands::lineage::run(&store, tax_id, *as_of).await,
        Commands::Children { tax_id, as_of } => commands::children::run(&store, tax_id, *as_of).await,
        Commands::Versions { tax_id, as_of } => commands::versions::run(&store, tax_id, *as_of).await,
        Commands::Search { query, limit } => commands::search::run(&store, query, *limit).await,
        Commands::RandomSpecies => commands::random::run(&store).await,
    }
}
