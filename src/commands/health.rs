use anyhow::Result;
use colored::Colorize;
use log_aggregator::client::{ClientConfig, LogClient};

/// Execute the health command
///
/// Exits with an error when the server does not answer the health check.
pub async fn execute(endpoint: Option<String>) -> Result<()> {
    let client = LogClient::new(ClientConfig {
        api_endpoint: endpoint,
        ..ClientConfig::default()
    })?;

    if client.check_connection().await {
        println!("{} {}", "✓ Server is healthy:".green(), client.endpoint());
        Ok(())
    } else {
        println!("{} {}", "✗ Server is unreachable:".red(), client.endpoint());
        anyhow::bail!("Health check failed")
    }
}
