use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Message returned for request bodies that are not JSON
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON";

/// Application error types surfaced at the HTTP boundary
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body failed to parse as JSON
    #[error("{}", INVALID_JSON_MESSAGE)]
    InvalidJson,

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type_name(&self) -> &'static str {
        match self {
            Self::InvalidJson => "invalid_json",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.error_type_name(), "Request failed");
            crate::metrics::record_error(self.error_type_name());
        }

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}
