//! Log entry types shared by the store, the HTTP handlers and the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_HOST: &str = "unknown";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Format used for server-generated timestamps (matches SQLite `CURRENT_TIMESTAMP`)
pub const SERVER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A stored log record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LogEntry {
    pub id: i64,
    pub host: String,
    pub host_process: Option<String>,
    pub log_level: String,
    pub log_message: String,
    pub timestamp: String,
    pub created_at: String,
}

/// A log record ready for insertion (defaults already applied)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLogEntry {
    pub host: String,
    pub host_process: Option<String>,
    pub log_level: String,
    pub log_message: String,
    pub timestamp: String,
}

/// Raw submission as received over the wire
///
/// Every field is optional. A key that is missing or set to JSON `null`
/// is treated as absent; an explicit empty string is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogInput {
    pub host: Option<String>,
    pub host_process: Option<String>,
    pub log_level: Option<String>,
    pub log_message: Option<String>,
    pub timestamp: Option<String>,
}

impl LogInput {
    /// Extract the known fields from any JSON value
    ///
    /// Non-object values (including `null`) carry no fields. Numbers and
    /// booleans are kept in their textual form; nested objects and arrays
    /// are stored as compact JSON.
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let field = |name: &str| obj.get(name).and_then(value_to_text);

        Self {
            host: field("host"),
            host_process: field("host_process"),
            log_level: field("log_level"),
            log_message: field("log_message"),
            timestamp: field("timestamp"),
        }
    }

    /// Apply the default values for absent fields
    ///
    /// `now` is only consulted when no timestamp was supplied.
    pub fn into_new_entry(self, now: DateTime<Utc>) -> NewLogEntry {
        NewLogEntry {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            host_process: self.host_process,
            log_level: self.log_level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_message: self.log_message.unwrap_or_default(),
            timestamp: self
                .timestamp
                .unwrap_or_else(|| format_server_timestamp(now)),
        }
    }
}

/// Render a point in time the way the server stores default timestamps
pub fn format_server_timestamp(at: DateTime<Utc>) -> String {
    at.format(SERVER_TIMESTAMP_FORMAT).to_string()
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
