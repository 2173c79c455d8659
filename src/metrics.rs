use anyhow::Context;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder as the global metrics recorder
///
/// Fails if a recorder is already installed.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    init_metric_descriptions();

    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!(
        "log_entries_ingested_total",
        "Total number of log entries accepted by POST /api/logs"
    );
    describe_counter!(
        "log_queries_total",
        "Total number of log queries served"
    );
    describe_histogram!(
        "log_store_operation_duration_seconds",
        "Log store operation duration in seconds"
    );
    describe_counter!(
        "log_aggregator_errors_total",
        "Total number of failed requests"
    );
    describe_gauge!(
        "log_aggregator_info",
        "Version and build information"
    );

    gauge!("log_aggregator_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record an accepted log entry
pub fn record_ingested(log_level: &str) {
    counter!(
        "log_entries_ingested_total",
        "log_level" => log_level.to_string(),
    )
    .increment(1);
}

/// Record a served query
pub fn record_query(view: &str) {
    counter!("log_queries_total", "view" => view.to_string()).increment(1);
}

/// Record a store operation and how long it took
pub fn record_store_operation(operation: &str, outcome: &str, duration: Duration) {
    histogram!(
        "log_store_operation_duration_seconds",
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record a failed request
pub fn record_error(error_type: &str) {
    counter!(
        "log_aggregator_errors_total",
        "error_type" => error_type.to_string(),
    )
    .increment(1);
}
