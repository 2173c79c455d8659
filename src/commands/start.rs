use anyhow::Result;
use colored::Colorize;
use log_aggregator::{config, init_tracing, server};
use std::path::Path;
use tracing::info;

/// Execute the start command
///
/// Loads configuration, initializes tracing from it and serves until a
/// shutdown signal arrives.
pub async fn execute(config_path: &Path) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    init_tracing(&cfg.server.log_level, &cfg.server.log_format);

    println!("{}", "Starting log aggregator...".green());
    info!(
        config = %config_path.display(),
        database = %config::mask_database_url(&cfg.database.url),
        "Starting log aggregator"
    );

    server::start_server(cfg).await
}
