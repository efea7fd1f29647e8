//! Tracking context
//!
//! Everything a tracker's components share: the store connection, the
//! configuration, the change detector built from it, and the counters.
//! One context per store connection; nothing is process-global.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::observability::MetricsRegistry;
use crate::store::{Document, DocumentStore, ID_FIELD, KEY_FIELD, REV_FIELD};

use super::config::TrackerConfig;
use super::detector::ChangeDetector;
use super::errors::{TrackError, TrackResult};
use super::handle::CollectionNames;

/// Entity field holding its creation time
pub const CREATED_FIELD: &str = "_created";
/// Entity field holding its last modification time
pub const MODIFIED_FIELD: &str = "_modified";
/// Snapshot field holding the owning entity handle
pub const PARENT_FIELD: &str = "_parent";

/// Fields the store and the writer maintain; never part of tracked content
pub const MANAGED_FIELDS: [&str; 6] = [
    ID_FIELD,
    KEY_FIELD,
    REV_FIELD,
    CREATED_FIELD,
    MODIFIED_FIELD,
    PARENT_FIELD,
];

/// Shared state of one tracker
pub struct TrackContext {
    pub store: Arc<dyn DocumentStore>,
    pub config: TrackerConfig,
    pub detector: ChangeDetector,
    pub metrics: MetricsRegistry,
}

impl TrackContext {
    /// Build a context, validating the configuration
    pub fn new(store: Arc<dyn DocumentStore>, config: TrackerConfig) -> TrackResult<Self> {
        config.validate()?;
        let detector = ChangeDetector::new(
            MANAGED_FIELDS
                .iter()
                .map(|f| f.to_string())
                .chain(config.system_fields.iter().cloned()),
        );
        Ok(Self {
            store,
            config,
            detector,
            metrics: MetricsRegistry::new(),
        })
    }

    /// Collection names for a tracked collection
    pub fn names(&self, collection: &str) -> TrackResult<CollectionNames> {
        CollectionNames::resolve(collection, &self.config)
    }
}

impl std::fmt::Debug for TrackContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackContext")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// Timestamps are stored as RFC 3339 with millisecond precision
pub fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Parse a timestamp field written by [`timestamp`]
pub fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Handle of a document returned by the store
pub fn document_id(doc: &Document) -> TrackResult<String> {
    doc.id()
        .map(str::to_string)
        .ok_or_else(|| TrackError::Store("store returned a document without _id".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_round_trip() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).single().unwrap();
        let value = timestamp(at);
        assert_eq!(value, "2023-11-14T22:13:20.123Z");
        assert_eq!(parse_timestamp(Some(&value)), Some(at));
        assert_eq!(parse_timestamp(None), None);
    }

    #[test]
    fn test_context_rejects_invalid_config() {
        let config = TrackerConfig {
            edges_suffix: String::new(),
            ..Default::default()
        };
        assert!(TrackContext::new(Arc::new(MemoryStore::new()), config).is_err());
    }

    #[test]
    fn test_managed_fields_ignored_without_listing() {
        let config = TrackerConfig {
            system_fields: vec!["etag".to_string()],
            ..Default::default()
        };
        let ctx = TrackContext::new(Arc::new(MemoryStore::new()), config).unwrap();
        for field in MANAGED_FIELDS {
            assert!(ctx.detector.is_system_field(field), "{}", field);
        }
        assert!(ctx.detector.is_system_field("etag"));
        assert!(!ctx.detector.is_system_field("name"));
    }
}
