//! HTTP handlers
//!
//! - logs: submit and query the JSON API
//! - view: HTML table of every stored entry
//! - health: liveness probe (never touches the store)
//! - metrics_handler: Prometheus exposition

pub mod health;
pub mod logs;
pub mod metrics_handler;
pub mod view;

use crate::store::LogStore;
use std::sync::Arc;

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LogStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }
}
