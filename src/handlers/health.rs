use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

/// Health check endpoint
/// Returns 200 OK whenever the process is serving requests; the store is not consulted
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "OK" })))
}
