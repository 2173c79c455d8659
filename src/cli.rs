use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "log-aggregator", version, about = "Centralized log aggregation service")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the aggregation server (default)
    Start,

    /// Create the log table if it does not exist
    Migrate,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Query stored logs directly from the database
    Logs(crate::commands::logs::LogsArgs),

    /// Submit a single log entry to a running server
    Send(crate::commands::send::SendArgs),

    /// Check that a running server is reachable
    Health {
        /// Submit endpoint of the server (e.g. http://localhost:8071/api/logs)
        #[arg(short, long, env = "LOG_AGGREGATOR_API_ENDPOINT")]
        endpoint: Option<String>,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display current configuration (with secrets masked)
    Show,

    /// Validate configuration file
    Validate,
}

impl Cli {
    /// Get the command to execute, defaulting to Start if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Start)
    }
}
