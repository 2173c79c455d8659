use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL (`sqlite:` or `mysql:`)
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub endpoint: String,
}

/// Paths served by the API; the metrics endpoint may not shadow them
const RESERVED_PATHS: &[&str] = &["/api/logs", "/api/health", "/logs"];

/// Load configuration from built-in defaults, an optional TOML file and
/// `LOG_AGGREGATOR__*` environment variables (in increasing precedence).
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8071)?
        .set_default("server.log_level", "info")?
        .set_default("server.log_format", "pretty")?
        .set_default("server.max_body_bytes", 1024 * 1024)?
        .set_default("database.url", "sqlite://./data/logs.sqlite?mode=rwc")?
        .set_default("database.max_connections", 5)?
        .set_default("database.acquire_timeout_seconds", 30)?
        .set_default("metrics.enabled", true)?
        .set_default("metrics.endpoint", "/metrics")?
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("LOG_AGGREGATOR").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        anyhow::bail!("Server port must be non-zero");
    }

    match cfg.server.log_format.as_str() {
        "pretty" | "json" => {}
        other => anyhow::bail!("Invalid log format '{}' (expected 'pretty' or 'json')", other),
    }

    if cfg.server.max_body_bytes == 0 {
        anyhow::bail!("server.max_body_bytes must be at least 1");
    }

    if !cfg.database.url.starts_with("sqlite:")
        && !cfg.database.url.starts_with("mysql:")
        && !cfg.database.url.starts_with("mariadb:")
    {
        anyhow::bail!(
            "Unsupported database URL '{}' (expected sqlite: or mysql:)",
            mask_database_url(&cfg.database.url)
        );
    }

    if cfg.database.max_connections == 0 {
        anyhow::bail!("database.max_connections must be at least 1");
    }

    if cfg.metrics.enabled {
        if !cfg.metrics.endpoint.starts_with('/') {
            anyhow::bail!("Metrics endpoint '{}' must start with '/'", cfg.metrics.endpoint);
        }
        if RESERVED_PATHS.contains(&cfg.metrics.endpoint.as_str()) {
            anyhow::bail!(
                "Metrics endpoint '{}' collides with an API route",
                cfg.metrics.endpoint
            );
        }
    }

    Ok(())
}

/// Hide the password component of a database URL
///
/// Example: "mysql://root:secret@db/logs" -> "mysql://root:***@db/logs"
pub fn mask_database_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            if parsed.set_password(Some("***")).is_ok() {
                parsed.to_string()
            } else {
                raw.to_string()
            }
        }
        _ => raw.to_string(),
    }
}
