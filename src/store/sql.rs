//! SQL log store over the sqlx `Any` driver
//!
//! This module provides:
//! - Connection pooling (one pool per process, shared by all requests)
//! - Schema creation for SQLite and MySQL
//! - Parameterized insert and filtered query

use super::{LogFilter, LogStore, StoreError};
use crate::config::DatabaseConfig;
use crate::models::{LogEntry, NewLogEntry};
use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use sqlx::{Any, QueryBuilder};
use std::path::Path;
use std::time::{Duration, Instant};

// SQLite keeps `timestamp` as TEXT: a DATETIME column has NUMERIC affinity and
// would rewrite values such as "1.50" or "2024" into numbers.
const SQLITE_SCHEMA: &str = r#"CREATE TABLE IF NOT EXISTS logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    host VARCHAR(100) NOT NULL,
    host_process VARCHAR(100),
    log_level VARCHAR(20) NOT NULL,
    log_message TEXT NOT NULL,
    `timestamp` TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)"#;

const MYSQL_SCHEMA: &str = r#"CREATE TABLE IF NOT EXISTS logs (
    id BIGINT PRIMARY KEY AUTO_INCREMENT,
    host VARCHAR(100) NOT NULL,
    host_process VARCHAR(100),
    log_level VARCHAR(20) NOT NULL,
    log_message TEXT NOT NULL,
    `timestamp` DATETIME NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)"#;

const INSERT_LOG: &str = "INSERT INTO logs (host, host_process, log_level, log_message, `timestamp`) \
     VALUES (?, ?, ?, ?, ?)";

// Datetime columns are read back as text so both backends decode the same way.
const SELECT_LOGS: &str = "SELECT id, host, host_process, log_level, log_message, \
     CAST(`timestamp` AS CHAR) AS `timestamp`, CAST(created_at AS CHAR) AS created_at \
     FROM logs WHERE 1=1";

/// Relational engine behind a database URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    MySql,
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self, StoreError> {
        if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else if url.starts_with("mysql:") || url.starts_with("mariadb:") {
            Ok(Self::MySql)
        } else {
            Err(StoreError::UnsupportedBackend(url.to_string()))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
        }
    }

    fn schema(&self) -> &'static str {
        match self {
            Self::Sqlite => SQLITE_SCHEMA,
            Self::MySql => MYSQL_SCHEMA,
        }
    }
}

/// Log store backed by a SQL connection pool
#[derive(Clone)]
pub struct SqlLogStore {
    pool: AnyPool,
    backend: Backend,
}

impl SqlLogStore {
    /// Open the connection pool described by `config`
    ///
    /// SQLite files (and their parent directories) are created when missing.
    /// In-memory SQLite databases are pinned to a single long-lived
    /// connection, since every new connection would otherwise see an empty
    /// database.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();

        let backend = Backend::from_url(&config.url)?;
        if backend == Backend::Sqlite {
            ensure_sqlite_parent_dir(&config.url)?;
        }

        let mut options = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));

        if is_in_memory(&config.url) {
            options = options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options.connect(&config.url).await?;

        tracing::info!(
            backend = backend.name(),
            max_connections = config.max_connections,
            "Connected to log database"
        );

        Ok(Self { pool, backend })
    }

    /// Connect and make sure the `logs` table exists
    pub async fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let store = Self::connect(config).await?;
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create the `logs` table if it is absent
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(self.backend.schema())
            .execute(&self.pool)
            .await?;

        tracing::info!(backend = self.backend.name(), "Log table ready");
        Ok(())
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl LogStore for SqlLogStore {
    async fn insert(&self, entry: &NewLogEntry) -> Result<i64, StoreError> {
        let start = Instant::now();

        let result = sqlx::query(INSERT_LOG)
            .bind(entry.host.as_str())
            .bind(entry.host_process.as_deref())
            .bind(entry.log_level.as_str())
            .bind(entry.log_message.as_str())
            .bind(entry.timestamp.as_str())
            .execute(&self.pool)
            .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(_) => "error",
        };
        crate::metrics::record_store_operation("insert", outcome, start.elapsed());

        let id = result?.last_insert_id().ok_or(StoreError::MissingInsertId)?;

        tracing::debug!(
            id = id,
            host = %entry.host,
            log_level = %entry.log_level,
            duration_ms = start.elapsed().as_millis() as u64,
            "Inserted log entry"
        );

        Ok(id)
    }

    async fn query(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, StoreError> {
        let start = Instant::now();

        let mut builder = build_select(filter);
        let result = builder
            .build_query_as::<LogEntry>()
            .fetch_all(&self.pool)
            .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(_) => "error",
        };
        crate::metrics::record_store_operation("query", outcome, start.elapsed());

        let logs = result?;

        tracing::debug!(
            count = logs.len(),
            filtered = !filter.is_unconstrained(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Queried log entries"
        );

        Ok(logs)
    }
}

/// Build the parameterized SELECT for a filter set
fn build_select(filter: &LogFilter) -> QueryBuilder<'static, Any> {
    let mut builder = QueryBuilder::new(SELECT_LOGS);

    if let Some(host) = filter.host() {
        builder.push(" AND host = ").push_bind(host.to_string());
    }
    if let Some(process) = filter.host_process() {
        builder.push(" AND host_process = ").push_bind(process.to_string());
    }
    if let Some(level) = filter.log_level() {
        builder.push(" AND log_level = ").push_bind(level.to_string());
    }
    if let Some(from) = filter.timestamp_from() {
        builder
            .push(" AND CAST(`timestamp` AS CHAR) >= ")
            .push_bind(from.to_string());
    }
    if let Some(to) = filter.timestamp_to() {
        builder
            .push(" AND CAST(`timestamp` AS CHAR) <= ")
            .push_bind(to.to_string());
    }

    builder.push(" ORDER BY id ASC");
    builder
}

fn is_in_memory(url: &str) -> bool {
    url.starts_with("sqlite:") && (url.contains(":memory:") || url.contains("mode=memory"))
}

/// Create the parent directory of a SQLite database file
fn ensure_sqlite_parent_dir(url: &str) -> Result<(), StoreError> {
    if is_in_memory(url) {
        return Ok(());
    }

    let path_part = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path_only = match path_part.split_once('?') {
        Some((path, _)) => path,
        None => path_part,
    };

    if path_only.is_empty() {
        return Ok(());
    }

    if let Some(parent) = Path::new(path_only).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LogInput, NewLogEntry};
    use chrono::Utc;

    async fn memory_store() -> SqlLogStore {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 5,
        };
        SqlLogStore::open(&config).await.unwrap()
    }

    fn new_entry(host: &str, process: Option<&str>, level: &str, timestamp: &str) -> NewLogEntry {
        NewLogEntry {
            host: host.to_string(),
            host_process: process.map(str::to_string),
            log_level: level.to_string(),
            log_message: format!("message from {host}"),
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn test_backend_from_url() {
        assert_eq!(Backend::from_url("sqlite::memory:").unwrap(), Backend::Sqlite);
        assert_eq!(
            Backend::from_url("sqlite://./data/logs.sqlite?mode=rwc").unwrap(),
            Backend::Sqlite
        );
        assert_eq!(
            Backend::from_url("mysql://root@localhost/logs").unwrap(),
            Backend::MySql
        );
        assert!(matches!(
            Backend::from_url("postgres://localhost/logs"),
            Err(StoreError::UnsupportedBackend(_))
        ));
    }

    #[test]
    fn test_is_in_memory() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://:memory:"));
        assert!(is_in_memory("sqlite://file:logs?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://./data/logs.sqlite"));
        assert!(!is_in_memory("mysql://localhost/logs"));
    }

    #[test]
    fn test_unfiltered_select_has_no_bindings() {
        let builder = build_select(&LogFilter::default());
        let sql = builder.sql();
        assert!(sql.ends_with("WHERE 1=1 ORDER BY id ASC"));
    }

    #[test]
    fn test_select_includes_only_present_filters() {
        let filter = LogFilter {
            host: Some("a".to_string()),
            log_level: Some(String::new()),
            timestamp_to: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        let builder = build_select(&filter);
        let sql = builder.sql();

        assert!(sql.contains("AND host = ?"));
        assert!(sql.contains("AND CAST(`timestamp` AS CHAR) <= ?"));
        assert!(!sql.contains("log_level ="));
        assert!(!sql.contains("host_process ="));
        assert!(!sql.contains(">="));
    }

    #[tokio::test]
    async fn test_insert_returns_increasing_ids() {
        let store = memory_store().await;

        let first = store
            .insert(&new_entry("a", None, "INFO", "2024-01-01 00:00:00"))
            .await
            .unwrap();
        let second = store
            .insert(&new_entry("b", None, "INFO", "2024-01-01 00:00:01"))
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_insert_and_query_round_trip() {
        let store = memory_store().await;

        let id = store
            .insert(&new_entry(
                "server1.example.com",
                Some("nginx"),
                "ERROR",
                "2023-10-27T10:00:00Z",
            ))
            .await
            .unwrap();

        let logs = store.query_all().await.unwrap();
        assert_eq!(logs.len(), 1);

        let log = &logs[0];
        assert_eq!(log.id, id);
        assert_eq!(log.host, "server1.example.com");
        assert_eq!(log.host_process.as_deref(), Some("nginx"));
        assert_eq!(log.log_level, "ERROR");
        assert_eq!(log.log_message, "message from server1.example.com");
        assert_eq!(log.timestamp, "2023-10-27T10:00:00Z");
        assert!(!log.created_at.is_empty());
    }

    #[tokio::test]
    async fn test_query_combines_filters_with_and() {
        let store = memory_store().await;
        let a = store
            .insert(&new_entry("a", None, "ERROR", "2024-01-01 00:00:00"))
            .await
            .unwrap();
        store
            .insert(&new_entry("b", None, "ERROR", "2024-01-01 00:00:00"))
            .await
            .unwrap();
        store
            .insert(&new_entry("a", None, "INFO", "2024-01-01 00:00:00"))
            .await
            .unwrap();

        let filter = LogFilter {
            host: Some("a".to_string()),
            log_level: Some("ERROR".to_string()),
            ..Default::default()
        };
        let logs = store.query(&filter).await.unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, a);
    }

    #[tokio::test]
    async fn test_query_timestamp_range_is_inclusive() {
        let store = memory_store().await;
        for day in 1..=5 {
            store
                .insert(&new_entry("a", None, "INFO", &format!("2024-01-0{day} 00:00:00")))
                .await
                .unwrap();
        }

        let filter = LogFilter {
            timestamp_from: Some("2024-01-02 00:00:00".to_string()),
            timestamp_to: Some("2024-01-04 00:00:00".to_string()),
            ..Default::default()
        };
        let logs = store.query(&filter).await.unwrap();

        let stamps: Vec<&str> = logs.iter().map(|l| l.timestamp.as_str()).collect();
        assert_eq!(
            stamps,
            vec![
                "2024-01-02 00:00:00",
                "2024-01-03 00:00:00",
                "2024-01-04 00:00:00"
            ]
        );
    }

    #[tokio::test]
    async fn test_year_only_bounds_compare_as_text() {
        let store = memory_store().await;
        store
            .insert(&new_entry("a", None, "INFO", "2024-06-01 00:00:00"))
            .await
            .unwrap();
        store.insert(&new_entry("b", None, "INFO", "1.50")).await.unwrap();

        let upper = LogFilter {
            timestamp_to: Some("2025".to_string()),
            ..Default::default()
        };
        let stamps: Vec<String> = store
            .query(&upper)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.timestamp)
            .collect();
        assert_eq!(stamps, vec!["2024-06-01 00:00:00", "1.50"]);

        let lower = LogFilter {
            timestamp_from: Some("2024".to_string()),
            ..Default::default()
        };
        let logs = store.query(&lower).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].host, "a");
    }

    #[tokio::test]
    async fn test_query_by_host_process() {
        let store = memory_store().await;
        store
            .insert(&new_entry("a", Some("nginx"), "INFO", "2024-01-01"))
            .await
            .unwrap();
        store
            .insert(&new_entry("a", None, "INFO", "2024-01-01"))
            .await
            .unwrap();

        let filter = LogFilter {
            host_process: Some("nginx".to_string()),
            ..Default::default()
        };
        let logs = store.query(&filter).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].host_process.as_deref(), Some("nginx"));
    }

    #[tokio::test]
    async fn test_results_are_ascending_by_id() {
        let store = memory_store().await;
        // Timestamps deliberately out of order
        for ts in ["2024-01-03", "2024-01-01", "2024-01-02"] {
            store.insert(&new_entry("a", None, "INFO", ts)).await.unwrap();
        }

        let ids: Vec<i64> = store.query_all().await.unwrap().iter().map(|l| l.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn test_defaulted_entry_is_stored() {
        let store = memory_store().await;
        let entry = LogInput::default().into_new_entry(Utc::now());

        let id = store.insert(&entry).await.unwrap();
        let logs = store.query_all().await.unwrap();

        assert_eq!(logs[0].id, id);
        assert_eq!(logs[0].host, "unknown");
        assert_eq!(logs[0].log_level, "INFO");
        assert_eq!(logs[0].log_message, "");
        assert_eq!(logs[0].timestamp, entry.timestamp);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let store = memory_store().await;
        store.run_migrations().await.unwrap();
        store.run_migrations().await.unwrap();
        assert!(store.query_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_pool_reports_storage_error() {
        let store = memory_store().await;
        store.close().await;

        let result = store
            .insert(&new_entry("a", None, "INFO", "2024-01-01"))
            .await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }
}
