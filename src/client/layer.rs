//! `tracing` layer that forwards application events to the aggregator

use super::AsyncShipper;
use crate::models::NewLogEntry;
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::{field::Field, Event, Level, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

/// Targets whose events are never shipped (the client's own transport)
const SKIPPED_TARGETS: &[&str] = &["log_aggregator::client", "reqwest", "hyper", "h2"];

/// Layer that converts events into log entries and queues them for shipping
pub struct AggregatorLayer {
    shipper: AsyncShipper,
    host: String,
    level_names: HashMap<Level, String>,
}

impl AggregatorLayer {
    pub fn new(shipper: AsyncShipper, host: impl Into<String>) -> Self {
        Self {
            shipper,
            host: host.into(),
            level_names: HashMap::new(),
        }
    }

    /// Report `level` under a custom name (e.g. ERROR as "CRITICAL")
    pub fn with_level_name(mut self, level: Level, name: impl Into<String>) -> Self {
        self.level_names.insert(level, name.into());
        self
    }

    fn level_label(&self, level: &Level) -> String {
        match self.level_names.get(level) {
            Some(name) => name.clone(),
            None => level_name(level).to_string(),
        }
    }
}

impl<S> Layer<S> for AggregatorLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();

        if is_skipped_target(target) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.shipper.ship(NewLogEntry {
            host: self.host.clone(),
            host_process: Some(target.to_string()),
            log_level: self.level_label(metadata.level()),
            log_message: visitor.into_message(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        });
    }
}

fn is_skipped_target(target: &str) -> bool {
    SKIPPED_TARGETS.iter().any(|skipped| {
        target == *skipped
            || target
                .strip_prefix(skipped)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

/// Level names as conventionally used by log collectors
fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "TRACE",
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARNING",
        Level::ERROR => "ERROR",
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl FieldVisitor {
    fn into_message(self) -> String {
        let mut out = self.message.unwrap_or_default();
        for (name, value) in self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(out, "{}={}", name, value);
        }
        out
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            name => self.fields.push((name, value.to_string())),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{:?}", value)),
            name => self.fields.push((name, format!("{:?}", value))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::shipper::ShipperMessage;
    use tracing_subscriber::prelude::*;

    // Events in this module default to a skipped target, so tests name one
    fn capture(emit: impl FnOnce()) -> Vec<NewLogEntry> {
        capture_with(|layer| layer, emit)
    }

    fn capture_with(
        configure: impl FnOnce(AggregatorLayer) -> AggregatorLayer,
        emit: impl FnOnce(),
    ) -> Vec<NewLogEntry> {
        let (shipper, mut rx) = AsyncShipper::detached();
        let layer = configure(AggregatorLayer::new(shipper, "test-host"));
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, emit);

        let mut entries = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let ShipperMessage::Entry(entry) = msg {
                entries.push(entry);
            }
        }
        entries
    }

    #[test]
    fn test_event_becomes_entry() {
        let entries = capture(|| {
            tracing::info!(target: "billing::worker", "invoice sent");
        });

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.host, "test-host");
        assert_eq!(entry.host_process.as_deref(), Some("billing::worker"));
        assert_eq!(entry.log_level, "INFO");
        assert_eq!(entry.log_message, "invoice sent");
        assert!(entry.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
    }

    #[test]
    fn test_warn_maps_to_warning() {
        let entries = capture(|| tracing::warn!(target: "app", "disk almost full"));
        assert_eq!(entries[0].log_level, "WARNING");
    }

    #[test]
    fn test_fields_appended_to_message() {
        let entries = capture(|| {
            tracing::error!(target: "app", user = "alice", attempts = 3, "login failed");
        });
        assert_eq!(entries[0].log_message, "login failed user=alice attempts=3");
    }

    #[test]
    fn test_transport_targets_are_skipped() {
        let entries = capture(|| {
            tracing::info!(target: "hyper::proto", "frame");
            tracing::info!(target: "reqwest", "request");
            tracing::info!(target: "log_aggregator::client::shipper", "retry");
            tracing::info!(target: "hyperion", "kept");
        });
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].host_process.as_deref(), Some("hyperion"));
    }

    #[test]
    fn test_level_name_override() {
        let entries = capture_with(
            |layer| layer.with_level_name(Level::ERROR, "CRITICAL"),
            || {
                tracing::error!(target: "app", "database unreachable");
                tracing::warn!(target: "app", "retrying");
            },
        );
        assert_eq!(entries[0].log_level, "CRITICAL");
        assert_eq!(entries[1].log_level, "WARNING");
    }
}
