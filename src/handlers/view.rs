//! Log browser HTML.

use super::AppState;
use crate::error::AppError;
use crate::models::LogEntry;
use axum::extract::State;
use axum::response::Html;

/// GET /logs - Render every stored entry as an HTML table
pub async fn view_logs(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let logs = state.store.query_all().await?;

    crate::metrics::record_query("html");

    Ok(Html(render_logs_page(&logs)))
}

/// Build the full page for a list of entries
pub fn render_logs_page(logs: &[LogEntry]) -> String {
    let mut rows = String::new();
    for log in logs {
        rows.push_str(&format!(
            "<tr><td>{id}</td><td>{host}</td><td>{process}</td><td class=\"lvl-{level_class}\">{level}</td><td>{message}</td><td>{timestamp}</td><td>{created_at}</td></tr>\n",
            id = log.id,
            host = html_escape(&log.host),
            process = html_escape(log.host_process.as_deref().unwrap_or("")),
            level_class = css_class_token(&log.log_level),
            level = html_escape(&log.log_level),
            message = html_escape(&log.log_message),
            timestamp = html_escape(&log.timestamp),
            created_at = html_escape(&log.created_at),
        ));
    }

    let template = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Logs</title>
  <style>
    body { font-family: system-ui, sans-serif; margin: 2rem; }
    h1 { margin: 0 0 1rem 0; }
    table { width: 100%; border-collapse: collapse; }
    th, td { border-bottom: 1px solid #ddd; text-align: left; padding: .5rem; vertical-align: top; }
    td:nth-child(5) { white-space: pre-wrap; font-family: ui-monospace, SFMono-Regular, Menlo, monospace; font-size: 12px; }
    .lvl-ERROR, .lvl-CRITICAL { color: #cf222e; font-weight: 600; }
    .lvl-WARNING, .lvl-WARN { color: #9a6700; }
    .lvl-INFO { color: #1a7f37; }
    .lvl-DEBUG { color: #0969da; }
  </style>
</head>
<body>
  <h1>Logs</h1>
  <table>
    <thead>
      <tr>
        <th>ID</th>
        <th>Host</th>
        <th>Host Process</th>
        <th>Log Level</th>
        <th>Log Message</th>
        <th>Timestamp</th>
        <th>Created At</th>
      </tr>
    </thead>
    <tbody>
__ROWS__    </tbody>
  </table>
</body>
</html>
"#;
    template.replace("__ROWS__", &rows)
}

/// Escape text for display inside HTML elements and attributes
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Keep only characters that are safe inside a class attribute
fn css_class_token(level: &str) -> String {
    level
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}
