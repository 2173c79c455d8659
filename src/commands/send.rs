use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use log_aggregator::client::{ClientConfig, LogClient};
use log_aggregator::models::{LogInput, NewLogEntry};

/// Submit one log entry
#[derive(Debug, Clone, Parser)]
pub struct SendArgs {
    /// Submit endpoint of the server (e.g. http://localhost:8071/api/logs)
    #[arg(short, long, env = "LOG_AGGREGATOR_API_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Reported host name (defaults to this machine's hostname)
    #[arg(long)]
    pub host: Option<String>,

    /// Process or component name
    #[arg(short, long)]
    pub process: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "INFO")]
    pub level: String,

    /// Log message
    #[arg(short, long)]
    pub message: String,

    /// Event timestamp (defaults to now, UTC)
    #[arg(short, long)]
    pub timestamp: Option<String>,

    /// Additional attempts after a failed delivery
    #[arg(long, default_value = "3")]
    pub retries: u32,
}

impl SendArgs {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig {
            api_endpoint: self.endpoint.clone(),
            retry_attempts: self.retries,
            ..ClientConfig::default()
        };
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        config
    }

    fn entry(&self, host: &str) -> NewLogEntry {
        LogInput {
            host: Some(host.to_string()),
            host_process: self.process.clone(),
            log_level: Some(self.level.clone()),
            log_message: Some(self.message.clone()),
            timestamp: self.timestamp.clone(),
        }
        .into_new_entry(Utc::now())
    }
}

/// Execute the send command
pub async fn execute(args: SendArgs) -> Result<()> {
    let client = LogClient::new(args.client_config())?;
    let entry = args.entry(client.host());

    let id = client
        .send(&entry)
        .await
        .with_context(|| format!("Failed to send log to {}", client.endpoint()))?;

    println!("{} (id {})", "✓ Log entry stored".green(), id);
    Ok(())
}
