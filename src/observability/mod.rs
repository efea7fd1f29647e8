//! Observability subsystem for trackdb
//!
//! This module provides:
//! - Named lifecycle events for tracked entities
//! - Per-tracker counters
//! - Structured logging through `tracing`
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on the revision graph
//! 3. Anomalies (missing or duplicated heads) log at WARN, everything else at DEBUG/INFO
//!
//! # Usage
//!
//! ```ignore
//! use trackdb::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::RevisionAppended, &[("handle", "users/alice"), ("rev", rev)]);
//! ```

mod events;
mod metrics;

pub use events::Event;
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Render fields as `key=value` pairs in deterministic (sorted) order
fn render_fields(fields: &[(&str, &str)]) -> String {
    let mut sorted: Vec<_> = fields.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let fields = render_fields(fields);
    if event.is_anomaly() {
        tracing::warn!(event = event.as_str(), %fields);
    } else {
        match event {
            Event::HeadConflict | Event::WriteRetried | Event::EntitySuperseded => {
                tracing::debug!(event = event.as_str(), %fields)
            }
            _ => tracing::info!(event = event.as_str(), %fields),
        }
    }
}
