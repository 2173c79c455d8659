//! Log submission and query API
//!
//! - `POST /api/logs`: store one entry, defaults applied to absent fields
//! - `GET /api/logs`: list entries matching the optional filter set

use super::AppState;
use crate::error::AppError;
use crate::models::{LogEntry, LogInput};
use crate::store::LogFilter;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Response for a stored entry
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: i64,
}

/// POST /api/logs - Store a log entry
///
/// The body is read raw so that only a genuine JSON parse failure is
/// rejected; any well-formed JSON value is accepted and defaulted.
///
/// Example body:
/// ```json
/// {"host": "server1.example.com", "host_process": "nginx", "log_level": "ERROR",
///  "log_message": "Failed to connect to database.", "timestamp": "2023-10-27T10:00:00Z"}
/// ```
pub async fn submit_log(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let value: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, body_len = body.len(), "Rejected malformed log submission");
        AppError::InvalidJson
    })?;

    let entry = LogInput::from_json(&value).into_new_entry(Utc::now());
    let id = state.store.insert(&entry).await?;

    crate::metrics::record_ingested(&entry.log_level);
    tracing::info!(
        id = id,
        host = %entry.host,
        log_level = %entry.log_level,
        "Stored log entry"
    );

    Ok((StatusCode::CREATED, Json(SubmitResponse { id })))
}

/// GET /api/logs - Query log entries
///
/// Example: GET /api/logs?host=server1.example.com&log_level=ERROR
///
/// Parameters are taken as raw pairs so a repeated name keeps its last
/// value instead of failing extraction.
pub async fn list_logs(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<LogEntry>>, AppError> {
    let filter = LogFilter::from_query_pairs(params);
    let logs = state.store.query(&filter).await?;

    crate::metrics::record_query("api");

    Ok(Json(logs))
}
