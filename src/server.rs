use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::Config,
    handlers::{self, AppState},
    metrics,
    signals::setup_signal_handlers,
    store::{LogStore, SqlLogStore},
};

/// Start the log aggregation server
///
/// This function:
/// 1. Opens the connection pool and ensures the schema exists
/// 2. Installs the Prometheus recorder (when enabled)
/// 3. Sets up signal handlers for graceful shutdown
/// 4. Serves requests until a shutdown signal arrives, then closes the pool
pub async fn start_server(config: Config) -> Result<()> {
    let store = SqlLogStore::open(&config.database)
        .await
        .context("Failed to open log database")?;

    let metrics_handle = if config.metrics.enabled {
        info!("Initializing Prometheus metrics...");
        Some(Arc::new(metrics::init_metrics()?))
    } else {
        None
    };

    let (shutdown_tx, signal_handle) = setup_signal_handlers();
    let mut shutdown_rx = shutdown_tx.subscribe();

    let shared_store: Arc<dyn LogStore> = Arc::new(store.clone());
    let app = create_router(AppState::new(shared_store), &config, metrics_handle);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .with_context(|| format!("Invalid server host '{}'", config.server.host))?,
        config.server.port,
    ));

    info!("Starting log aggregator on {}", addr);
    info!("Submit endpoint:  POST http://{}/api/logs", addr);
    info!("Log browser:      GET  http://{}/logs", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    signal_handle.abort();
    store.close().await;
    info!("Server stopped gracefully");

    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(
    state: AppState,
    config: &Config,
    metrics_handle: Option<Arc<PrometheusHandle>>,
) -> Router {
    let log_routes = Router::new()
        .route(
            "/api/logs",
            post(handlers::logs::submit_log).get(handlers::logs::list_logs),
        )
        .route("/logs", get(handlers::view::view_logs))
        .with_state(state);

    let mut app = Router::new()
        // No store access, stays up when the database is down
        .route("/api/health", get(handlers::health::health_check))
        .merge(log_routes);

    if let Some(handle) = metrics_handle {
        let metrics_routes = Router::new()
            .route(&config.metrics.endpoint, get(handlers::metrics_handler::metrics))
            .with_state(handle);
        app = app.merge(metrics_routes);
    }

    app.layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, MetricsConfig, ServerConfig};
    use crate::models::{LogEntry, NewLogEntry};
    use crate::store::{LogFilter, StoreError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct EmptyStore;

    #[async_trait]
    impl LogStore for EmptyStore {
        async fn insert(&self, _entry: &NewLogEntry) -> Result<i64, StoreError> {
            Ok(1)
        }

        async fn query(&self, _filter: &LogFilter) -> Result<Vec<LogEntry>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn create_test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8071,
                log_level: "info".to_string(),
                log_format: "pretty".to_string(),
                max_body_bytes: 64,
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
                acquire_timeout_seconds: 5,
            },
            metrics: MetricsConfig {
                enabled: true,
                endpoint: "/metrics".to_string(),
            },
        }
    }

    fn test_router(metrics: bool) -> Router {
        let handle = metrics.then(|| {
            let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
            Arc::new(recorder.handle())
        });
        create_router(AppState::new(Arc::new(EmptyStore)), &create_test_config(), handle)
    }

    #[tokio::test]
    async fn test_metrics_route_mounted_when_enabled() {
        let response = test_router(true)
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_route_absent_when_disabled() {
        let response = test_router(false)
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let body = format!(r#"{{"log_message": "{}"}}"#, "x".repeat(256));
        let response = test_router(false)
            .oneshot(
                Request::post("/api/logs")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
