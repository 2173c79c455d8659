use anyhow::{Context, Result};
use colored::Colorize;
use log_aggregator::{config, init_tracing, store::SqlLogStore};
use std::path::Path;

/// Execute the migrate command
///
/// Creates the `logs` table when absent. Safe to run repeatedly.
pub async fn execute(config_path: &Path) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    init_tracing(&cfg.server.log_level, &cfg.server.log_format);

    println!(
        "{} {}",
        "Migrating".yellow(),
        config::mask_database_url(&cfg.database.url)
    );

    let store = SqlLogStore::open(&cfg.database)
        .await
        .context("Failed to migrate log database")?;
    let backend = store.backend().name();
    store.close().await;

    println!("{} ({})", "✓ Log table is ready".green(), backend);
    Ok(())
}
