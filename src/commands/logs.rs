//! Logs query command
//!
//! Reads entries straight from the configured database, bypassing the
//! HTTP API.

use anyhow::{Context, Result};
use clap::Parser;
use colored::{ColoredString, Colorize};
use log_aggregator::config;
use log_aggregator::models::LogEntry;
use log_aggregator::store::{LogFilter, LogStore, SqlLogStore};
use std::path::Path;
use std::time::Duration;

/// Query and display logs
#[derive(Debug, Clone, Parser)]
pub struct LogsArgs {
    /// Filter by host
    #[arg(long)]
    pub host: Option<String>,

    /// Filter by host process
    #[arg(short, long)]
    pub process: Option<String>,

    /// Filter by log level (exact match, e.g. ERROR)
    #[arg(short, long)]
    pub level: Option<String>,

    /// Only entries with timestamp >= this value
    #[arg(long)]
    pub from: Option<String>,

    /// Only entries with timestamp <= this value
    #[arg(long)]
    pub to: Option<String>,

    /// Output format (text, json)
    #[arg(short = 'f', long, default_value = "text")]
    pub format: String,

    /// Keep polling for new entries (tail -f mode)
    #[arg(long)]
    pub follow: bool,

    /// Poll interval in milliseconds for --follow
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,
}

impl LogsArgs {
    fn filter(&self) -> LogFilter {
        LogFilter {
            host: self.host.clone(),
            host_process: self.process.clone(),
            log_level: self.level.clone(),
            timestamp_from: self.from.clone(),
            timestamp_to: self.to.clone(),
        }
    }
}

/// Execute the logs command
pub async fn execute(config_path: &Path, args: LogsArgs) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let store = SqlLogStore::open(&cfg.database)
        .await
        .context("Failed to open log database")?;

    let filter = args.filter();
    let result = if args.follow {
        follow_logs(&store, &filter, &args).await
    } else {
        let logs = store.query(&filter).await?;
        if logs.is_empty() && args.format != "json" {
            println!("{}", "No logs found matching the criteria".yellow());
            Ok(())
        } else {
            print_logs(&logs, &args.format)
        }
    };

    store.close().await;
    result
}

fn print_logs(logs: &[LogEntry], format: &str) -> Result<()> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(logs)?);
        }
        _ => {
            println!("{}", format!("Found {} log entries", logs.len()).bold());
            println!();
            for log in logs {
                println!("{}", format_log_line(log));
            }
        }
    }
    Ok(())
}

fn format_log_line(log: &LogEntry) -> String {
    let source = match &log.host_process {
        Some(process) => format!("{}/{}", log.host, process),
        None => log.host.clone(),
    };

    format!(
        "{} {} {} {} {}",
        format!("#{}", log.id).dimmed(),
        log.timestamp.dimmed(),
        colorize_level(&log.log_level),
        source.cyan(),
        log.log_message
    )
}

fn colorize_level(level: &str) -> ColoredString {
    match level.to_ascii_uppercase().as_str() {
        "CRITICAL" | "FATAL" | "ERROR" => level.red().bold(),
        "WARNING" | "WARN" => level.yellow().bold(),
        "INFO" => level.green(),
        "DEBUG" => level.blue(),
        _ => level.normal(),
    }
}

/// Entries strictly newer than `last_id`, advancing it past them
fn take_new_entries(logs: Vec<LogEntry>, last_id: &mut i64) -> Vec<LogEntry> {
    let fresh: Vec<LogEntry> = logs.into_iter().filter(|log| log.id > *last_id).collect();
    if let Some(max) = fresh.iter().map(|log| log.id).max() {
        *last_id = max;
    }
    fresh
}

async fn follow_logs(store: &SqlLogStore, filter: &LogFilter, args: &LogsArgs) -> Result<()> {
    println!("{}", "Following logs (Ctrl+C to stop)...".bold());
    println!();

    let mut last_id = 0;
    let mut poll_interval = tokio::time::interval(Duration::from_millis(args.interval_ms.max(100)));

    loop {
        tokio::select! {
            _ = poll_interval.tick() => {
                let logs = store.query(filter).await?;
                for log in take_new_entries(logs, &mut last_id) {
                    match args.format.as_str() {
                        "json" => println!("{}", serde_json::to_string(&log)?),
                        _ => println!("{}", format_log_line(&log)),
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("{}", "Stopped following logs".yellow());
                return Ok(());
            }
        }
    }
}
