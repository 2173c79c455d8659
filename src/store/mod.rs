//! Log persistence
//!
//! The [`LogStore`] trait is the seam between the HTTP layer and the
//! relational backend. [`SqlLogStore`] implements it over a pooled,
//! backend-agnostic connection so SQLite and MySQL share one query path.

pub mod sql;

use crate::models::{LogEntry, NewLogEntry};
use async_trait::async_trait;

pub use sql::{Backend, SqlLogStore};

/// Storage layer errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database did not report an id for the inserted row")]
    MissingInsertId,

    #[error("unsupported database url '{0}' (expected sqlite: or mysql:)")]
    UnsupportedBackend(String),

    #[error("failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),
}

/// Optional filter set for log queries
///
/// Absent and empty-string values both mean "no constraint". Present
/// values are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Exact match on host
    pub host: Option<String>,

    /// Exact match on host process
    pub host_process: Option<String>,

    /// Exact match on log level
    pub log_level: Option<String>,

    /// Inclusive lower bound on the entry timestamp
    pub timestamp_from: Option<String>,

    /// Inclusive upper bound on the entry timestamp
    pub timestamp_to: Option<String>,
}

impl LogFilter {
    pub fn host(&self) -> Option<&str> {
        non_empty(&self.host)
    }

    pub fn host_process(&self) -> Option<&str> {
        non_empty(&self.host_process)
    }

    pub fn log_level(&self) -> Option<&str> {
        non_empty(&self.log_level)
    }

    pub fn timestamp_from(&self) -> Option<&str> {
        non_empty(&self.timestamp_from)
    }

    pub fn timestamp_to(&self) -> Option<&str> {
        non_empty(&self.timestamp_to)
    }

    /// Build a filter from raw query-string pairs
    ///
    /// Unknown names are ignored. A repeated name keeps its last value.
    pub fn from_query_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut filter = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "host" => &mut filter.host,
                "host_process" => &mut filter.host_process,
                "log_level" => &mut filter.log_level,
                "timestamp_from" => &mut filter.timestamp_from,
                "timestamp_to" => &mut filter.timestamp_to,
                _ => continue,
            };
            *slot = Some(value);
        }
        filter
    }

    /// True when no constraint would be applied
    pub fn is_unconstrained(&self) -> bool {
        self.host().is_none()
            && self.host_process().is_none()
            && self.log_level().is_none()
            && self.timestamp_from().is_none()
            && self.timestamp_to().is_none()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Append-only log storage
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Append one entry and return its newly assigned id
    async fn insert(&self, entry: &NewLogEntry) -> Result<i64, StoreError>;

    /// Return every entry matching `filter`, ascending by id
    async fn query(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, StoreError>;

    /// Return every entry, ascending by id
    async fn query_all(&self) -> Result<Vec<LogEntry>, StoreError> {
        self.query(&LogFilter::default()).await
    }
}
