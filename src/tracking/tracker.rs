//! Tracker
//!
//! Entry point for revision-tracked writes and history reads against one
//! store connection. A tracker owns its configuration, counters and writer
//! locks; two trackers on the same store share nothing but the store and
//! coordinate only through its atomic head swap.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::store::{Document, DocumentStore, KEY_FIELD};

use super::config::TrackerConfig;
use super::context::TrackContext;
use super::detector::WriteClass;
use super::errors::{TrackError, TrackResult};
use super::handle::{CollectionNames, Handle};
use super::locks::HandleLocks;
use super::reader::RevisionReader;
use super::types::{ListOptions, RepairReport, RevisionDescriptor, SaveOutcome};
use super::writer::RevisionWriter;

/// Revision-tracking facade over a document store
#[derive(Debug)]
pub struct Tracker {
    ctx: Arc<TrackContext>,
    reader: RevisionReader,
    writer: RevisionWriter,
    locks: HandleLocks,
}

impl Tracker {
    /// Tracker with the default configuration
    pub fn new(store: Arc<dyn DocumentStore>) -> TrackResult<Self> {
        Self::with_config(store, TrackerConfig::default())
    }

    pub fn with_config(store: Arc<dyn DocumentStore>, config: TrackerConfig) -> TrackResult<Self> {
        let ctx = Arc::new(TrackContext::new(store, config)?);
        Ok(Self {
            reader: RevisionReader::new(Arc::clone(&ctx)),
            writer: RevisionWriter::new(Arc::clone(&ctx)),
            locks: HandleLocks::new(),
            ctx,
        })
    }

    pub fn reader(&self) -> &RevisionReader {
        &self.reader
    }

    pub fn writer(&self) -> &RevisionWriter {
        &self.writer
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.ctx.metrics
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.ctx.config
    }

    /// Collection names backing a tracked collection
    pub fn names(&self, collection: &str) -> TrackResult<CollectionNames> {
        self.ctx.names(collection)
    }

    /// Save one document into `collection`.
    ///
    /// The entity key is taken from the document's `_key`; without one the
    /// store assigns a key and the write is always a create. Writes that
    /// lose a head swap are re-classified and retried up to
    /// `max_conflict_retries` times.
    pub async fn save(&self, collection: &str, document: Value) -> TrackResult<SaveOutcome> {
        let names = self.names(collection)?;
        let fields = into_fields(document)?;
        let key = match fields.get(KEY_FIELD) {
            None => None,
            Some(Value::String(key)) => Some(key.clone()),
            Some(other) => {
                return Err(TrackError::validation(format!(
                    "{} must be a string, got {}",
                    KEY_FIELD, other
                )))
            }
        };

        match key {
            Some(key) => {
                let handle = names.entity_handle(&key)?;
                self.save_keyed(&names, &handle, &fields).await
            }
            None => {
                let created = self.writer.create(&names, None, &fields).await?;
                Ok(SaveOutcome::Created(Box::new(created)))
            }
        }
    }

    /// Save documents in order, one outcome per input.
    ///
    /// Stops at the first failure; earlier saves stay applied.
    pub async fn save_all(&self, collection: &str, documents: Vec<Value>) -> TrackResult<Vec<SaveOutcome>> {
        let mut outcomes = Vec::with_capacity(documents.len());
        for document in documents {
            outcomes.push(self.save(collection, document).await?);
        }
        Ok(outcomes)
    }

    /// Save a document under the entity `handle`, ignoring any `_key` it carries
    pub async fn put(&self, handle: &str, document: Value) -> TrackResult<SaveOutcome> {
        let handle = Handle::parse(handle)?;
        let names = self.names(handle.collection())?;
        let mut fields = into_fields(document)?;
        fields.insert(KEY_FIELD.to_string(), Value::String(handle.key().to_string()));
        self.save_keyed(&names, &handle, &fields).await
    }

    /// Remove an entity document. Its snapshots and edges are retained.
    pub async fn delete(&self, handle: &str) -> TrackResult<()> {
        let handle = Handle::parse(handle)?;
        self.names(handle.collection())?;
        let id = handle.to_string();

        let _guard = self.locks.lock(&id).await?;
        self.ctx.store.delete_document(&id).await?;

        self.ctx.metrics.increment_entities_deleted();
        log_event_with_fields(Event::EntityDeleted, &[("handle", &id)]);
        Ok(())
    }

    /// Whether an entity document exists
    pub async fn exists(&self, handle: &str) -> TrackResult<bool> {
        let handle = Handle::parse(handle)?;
        Ok(self.current(&handle.to_string()).await?.is_some())
    }

    /// Reconcile the head pointer of an entity
    pub async fn repair(&self, handle: &str) -> TrackResult<RepairReport> {
        let handle = Handle::parse(handle)?;
        let names = self.names(handle.collection())?;
        let id = handle.to_string();

        let _guard = self.locks.lock(&id).await?;
        if self.current(&id).await?.is_none() {
            return Err(TrackError::not_found(id));
        }
        self.writer.repair_head(&names, &id).await
    }

    pub async fn list(&self, handle: &str, options: ListOptions) -> TrackResult<Vec<RevisionDescriptor>> {
        self.reader.list(handle, options).await
    }

    pub async fn get(&self, collection: &str, rev: &str) -> TrackResult<Map<String, Value>> {
        self.reader.get(collection, rev).await
    }

    pub async fn latest(&self, handle: &str) -> TrackResult<RevisionDescriptor> {
        self.reader.latest(handle).await
    }

    pub async fn next(&self, collection: &str, rev: &str) -> TrackResult<RevisionDescriptor> {
        self.reader.next(collection, rev).await
    }

    pub async fn previous(&self, collection: &str, rev: &str) -> TrackResult<RevisionDescriptor> {
        self.reader.previous(collection, rev).await
    }

    async fn save_keyed(
        &self,
        names: &CollectionNames,
        handle: &Handle,
        fields: &Map<String, Value>,
    ) -> TrackResult<SaveOutcome> {
        let id = handle.to_string();
        let _guard = self.locks.lock(&id).await?;

        let max_retries = self.ctx.config.max_conflict_retries;
        let mut attempt = 0;
        loop {
            match self.save_once(names, handle, fields).await {
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    attempt += 1;
                    self.ctx.metrics.increment_write_retries();
                    log_event_with_fields(
                        Event::WriteRetried,
                        &[("handle", &id), ("attempt", &attempt.to_string())],
                    );
                }
                result => return result,
            }
        }
    }

    async fn save_once(
        &self,
        names: &CollectionNames,
        handle: &Handle,
        fields: &Map<String, Value>,
    ) -> TrackResult<SaveOutcome> {
        let id = handle.to_string();
        let existing = self.current(&id).await?;

        match self.ctx.detector.classify(existing.as_ref(), fields) {
            WriteClass::Create => {
                let created = self.writer.create(names, Some(handle.key()), fields).await?;
                Ok(SaveOutcome::Created(Box::new(created)))
            }
            WriteClass::Revise => {
                let existing = existing.ok_or_else(|| TrackError::not_found(id.clone()))?;
                let head = self.writer.observe_head(names, &id).await?;
                let revised = self.writer.revise(names, &existing, &head, fields).await?;
                Ok(SaveOutcome::Revised(Box::new(revised)))
            }
            WriteClass::NoOp => {
                self.ctx.metrics.increment_writes_unchanged();
                log_event_with_fields(Event::WriteUnchanged, &[("handle", &id)]);
                Ok(SaveOutcome::Unchanged { handle: id })
            }
        }
    }

    /// The entity document, or `None` if it (or its collection) is absent
    async fn current(&self, id: &str) -> TrackResult<Option<Document>> {
        match self.ctx.store.get_document(id).await {
            Ok(doc) => Ok(Some(doc)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn into_fields(document: Value) -> TrackResult<Map<String, Value>> {
    match document {
        Value::Object(fields) => Ok(fields),
        other => Err(TrackError::validation(format!(
            "document must be a JSON object, got {}",
            other
        ))),
    }
}
