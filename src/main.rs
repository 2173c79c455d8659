use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use log_aggregator::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.get_command();

    // Server commands configure tracing from the loaded config instead
    if !matches!(command, cli::Commands::Start | cli::Commands::Migrate) {
        init_tracing("warn", "pretty");
    }

    match command {
        cli::Commands::Start => {
            commands::start::execute(&args.config).await?;
        }
        cli::Commands::Migrate => {
            commands::migrate::execute(&args.config).await?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
            cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
        },
        cli::Commands::Logs(logs_args) => {
            commands::logs::execute(&args.config, logs_args).await?;
        }
        cli::Commands::Send(send_args) => {
            commands::send::execute(send_args).await?;
        }
        cli::Commands::Health { endpoint } => {
            commands::health::execute(endpoint).await?;
        }
        cli::Commands::Version => {
            println!("Log Aggregator v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
