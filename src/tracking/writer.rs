//! Revision writer
//!
//! Creates entities and appends revisions as a sequence of single-document
//! store calls. The store offers no multi-document transactions, so each
//! sequence is a saga:
//!
//! - A failure aborts the sequence and leaves completed steps in place.
//! - The head swap is the one atomic, conditional step. Steps before it only
//!   write an unreferenced snapshot, so a writer that loses the swap leaves
//!   nothing but garbage no head ever points to.
//! - Steps after the swap extend the chain and bring the entity document in
//!   line with the new head.
//! - Duplicate heads (from older writers or crashes) are reconciled by
//!   keeping the most recent one.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::observability::{log_event_with_fields, Event};
use crate::store::{key_order, Document, Edge, EdgeAttrs, EdgeKind, EdgeQuery, EdgeSort};

use super::context::{
    document_id, timestamp, TrackContext, CREATED_FIELD, MODIFIED_FIELD, PARENT_FIELD,
};
use super::errors::{TrackError, TrackResult};
use super::handle::CollectionNames;
use super::types::{CreatedEntity, RepairReport, RevisedEntity, RevisionDescriptor};

/// Orders head candidates; the greatest is kept
pub(crate) fn head_order(a: &Edge, b: &Edge) -> Ordering {
    a.attrs
        .created
        .cmp(&b.attrs.created)
        .then_with(|| key_order(&a.key, &b.key))
}

/// Writes entities, snapshots and revision edges
#[derive(Debug, Clone)]
pub struct RevisionWriter {
    ctx: Arc<TrackContext>,
}

impl RevisionWriter {
    pub fn new(ctx: Arc<TrackContext>) -> Self {
        Self { ctx }
    }

    /// Write a new entity and its first snapshot.
    ///
    /// Steps: entity document, snapshot, `headRevision` edge, `revision` edge.
    /// `key` of `None` lets the store choose. Fails with `Conflict` if the
    /// key is already taken.
    pub async fn create(
        &self,
        names: &CollectionNames,
        key: Option<&str>,
        fields: &Map<String, Value>,
    ) -> TrackResult<CreatedEntity> {
        let store = &self.ctx.store;
        let now = now_millis();
        let content = self.ctx.detector.strip(fields);

        let mut entity_body = content.clone();
        entity_body.insert(CREATED_FIELD.to_string(), timestamp(now));
        entity_body.insert(MODIFIED_FIELD.to_string(), timestamp(now));
        let entity = store
            .create_document(&names.entity, key, entity_body)
            .await?;
        let entity_id = document_id(&entity)?;

        let (snapshot, head_edge, revision_edge) =
            self.start_chain(names, &entity_id, content, now).await?;

        self.ctx.metrics.increment_entities_created();
        log_event_with_fields(
            Event::EntityCreated,
            &[("handle", &entity_id), ("rev", &head_edge.attrs.rev)],
        );

        Ok(CreatedEntity {
            entity,
            snapshot,
            head_edge,
            revision_edge,
        })
    }

    /// First snapshot of a chain plus its `headRevision` and `revision` edges
    async fn start_chain(
        &self,
        names: &CollectionNames,
        entity_id: &str,
        content: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> TrackResult<(Document, Edge, Edge)> {
        let store = &self.ctx.store;
        let snapshot = self.write_snapshot(names, entity_id, content, now).await?;
        let snapshot_id = document_id(&snapshot)?;
        let rev = snapshot_key(&snapshot)?;

        let head_edge = store
            .create_edge(
                &names.edges,
                entity_id,
                &snapshot_id,
                EdgeAttrs::new(EdgeKind::HeadRevision, rev.clone(), now).with_parent(entity_id),
            )
            .await?;

        let revision_edge = store
            .create_edge(
                &names.edges,
                entity_id,
                &snapshot_id,
                EdgeAttrs::new(EdgeKind::Revision, rev, now).with_parent(entity_id),
            )
            .await?;

        Ok((snapshot, head_edge, revision_edge))
    }

    /// Append a revision to an existing entity.
    ///
    /// `head` is the `headRevision` edge observed before the write. Steps:
    /// 1. write the new snapshot
    /// 2. swap `head` for a new head edge, atomically; `Conflict` if `head`
    ///    is no longer current
    /// 3. `prevRevision` edge new snapshot -> old snapshot, carrying the old
    ///    head's `rev` and `created`
    /// 4. `revision` edge entity -> new snapshot
    /// 5. replace the entity document, keeping its `_created`
    pub async fn revise(
        &self,
        names: &CollectionNames,
        existing: &Document,
        head: &Edge,
        fields: &Map<String, Value>,
    ) -> TrackResult<RevisedEntity> {
        let store = &self.ctx.store;
        let entity_id = document_id(existing)?;
        if head.from != entity_id || head.kind() != EdgeKind::HeadRevision {
            return Err(TrackError::integrity(format!(
                "edge {} is not the head of {}",
                head.id, entity_id
            )));
        }

        // created strictly increases along a chain, so reverse_created never ties
        let now = now_millis().max(head.attrs.created + Duration::milliseconds(1));
        let content = self.ctx.detector.strip(fields);

        let snapshot = self
            .write_snapshot(names, &entity_id, content.clone(), now)
            .await?;
        let snapshot_id = document_id(&snapshot)?;
        let rev = snapshot_key(&snapshot)?;

        let head_edge = match store
            .swap_edge(
                &head.id,
                &names.edges,
                &entity_id,
                &snapshot_id,
                EdgeAttrs::new(EdgeKind::HeadRevision, rev.clone(), now).with_parent(&entity_id),
            )
            .await
        {
            Ok(edge) => edge,
            Err(e) => {
                let err = TrackError::from(e);
                if err.is_retryable() {
                    self.ctx.metrics.increment_head_conflicts();
                    log_event_with_fields(
                        Event::HeadConflict,
                        &[("handle", &entity_id), ("orphan", &rev), ("head", &head.attrs.rev)],
                    );
                }
                return Err(err);
            }
        };

        let previous_revision_edge = store
            .create_edge(
                &names.edges,
                &snapshot_id,
                &head.to,
                EdgeAttrs::new(EdgeKind::PrevRevision, head.attrs.rev.clone(), head.attrs.created),
            )
            .await?;

        let revision_edge = store
            .create_edge(
                &names.edges,
                &entity_id,
                &snapshot_id,
                EdgeAttrs::new(EdgeKind::Revision, rev.clone(), now).with_parent(&entity_id),
            )
            .await?;

        let created = existing
            .get(CREATED_FIELD)
            .cloned()
            .unwrap_or_else(|| timestamp(now));
        let mut entity_body = content;
        entity_body.insert(CREATED_FIELD.to_string(), created);
        entity_body.insert(MODIFIED_FIELD.to_string(), timestamp(now));
        let entity = self
            .sync_entity(names, existing, entity_body, &rev)
            .await?;

        self.ctx.metrics.increment_revisions_appended();
        log_event_with_fields(
            Event::RevisionAppended,
            &[("handle", &entity_id), ("rev", &rev), ("prev", &head.attrs.rev)],
        );

        Ok(RevisedEntity {
            entity,
            snapshot,
            head_edge,
            previous_revision_edge,
            deleted_head_edge: head.clone(),
            revision_edge,
        })
    }

    /// All `headRevision` edges of an entity, newest first
    pub async fn heads(&self, names: &CollectionNames, entity_id: &str) -> TrackResult<Vec<Edge>> {
        let mut heads = self
            .ctx
            .store
            .query_edges(
                &names.edges,
                EdgeQuery::new()
                    .from(entity_id)
                    .kind(EdgeKind::HeadRevision),
            )
            .await?;
        heads.sort_by(|a, b| head_order(b, a));
        Ok(heads)
    }

    /// The head edge a revision must swap out.
    ///
    /// Missing head is an `Integrity` error. Duplicate heads are repaired
    /// first and the survivor returned.
    pub async fn observe_head(&self, names: &CollectionNames, entity_id: &str) -> TrackResult<Edge> {
        let mut heads = self.heads(names, entity_id).await?;
        match heads.len() {
            0 => {
                log_event_with_fields(Event::HeadMissing, &[("handle", entity_id)]);
                Err(TrackError::integrity(format!(
                    "entity {} has no head revision",
                    entity_id
                )))
            }
            1 => Ok(heads.remove(0)),
            _ => {
                log_event_with_fields(
                    Event::HeadDuplicated,
                    &[("handle", entity_id), ("count", &heads.len().to_string())],
                );
                self.remove_duplicate_heads(entity_id, &heads).await?;
                Ok(heads.remove(0))
            }
        }
    }

    /// Reconcile an entity's head pointer.
    ///
    /// Duplicate heads: keep the most recent by `created`, delete the rest.
    /// No head at all: recreate it from the newest `revision` edge. With no
    /// revisions either (a create stopped after the entity write), start a
    /// new chain from the entity document's current content.
    pub async fn repair_head(
        &self,
        names: &CollectionNames,
        entity_id: &str,
    ) -> TrackResult<RepairReport> {
        let heads = self.heads(names, entity_id).await?;

        if heads.is_empty() {
            return self.restore_head(names, entity_id).await;
        }

        let removed = if heads.len() > 1 {
            log_event_with_fields(
                Event::HeadDuplicated,
                &[("handle", entity_id), ("count", &heads.len().to_string())],
            );
            self.remove_duplicate_heads(entity_id, &heads).await?
        } else {
            Vec::new()
        };

        Ok(RepairReport {
            handle: entity_id.to_string(),
            kept: Some(RevisionDescriptor::from_edge(&heads[0])),
            removed,
            restored: false,
        })
    }

    async fn restore_head(&self, names: &CollectionNames, entity_id: &str) -> TrackResult<RepairReport> {
        let newest = self
            .ctx
            .store
            .query_edges(
                &names.edges,
                EdgeQuery::new()
                    .from(entity_id)
                    .kind(EdgeKind::Revision)
                    .sort(EdgeSort::ReverseCreatedAsc)
                    .limit(1),
            )
            .await?;

        let Some(revision) = newest.into_iter().next() else {
            return self.rebuild_chain(names, entity_id).await;
        };

        let attrs = EdgeAttrs::new(
            EdgeKind::HeadRevision,
            revision.attrs.rev.clone(),
            revision.attrs.created,
        )
        .with_parent(entity_id);
        let head = self
            .ctx
            .store
            .create_edge(&names.edges, entity_id, &revision.to, attrs)
            .await?;

        log_event_with_fields(
            Event::HeadRepaired,
            &[("handle", entity_id), ("restored", &head.attrs.rev)],
        );

        Ok(RepairReport {
            handle: entity_id.to_string(),
            kept: Some(RevisionDescriptor::from_edge(&head)),
            removed: Vec::new(),
            restored: true,
        })
    }

    async fn rebuild_chain(&self, names: &CollectionNames, entity_id: &str) -> TrackResult<RepairReport> {
        let entity = self.ctx.store.get_document(entity_id).await?;
        let content = self.ctx.detector.strip(entity.body());
        let (_, head, _) = self
            .start_chain(names, entity_id, content, now_millis())
            .await?;

        log_event_with_fields(
            Event::HeadRepaired,
            &[("handle", entity_id), ("rebuilt", &head.attrs.rev)],
        );

        Ok(RepairReport {
            handle: entity_id.to_string(),
            kept: Some(RevisionDescriptor::from_edge(&head)),
            removed: Vec::new(),
            restored: true,
        })
    }

    /// Delete all but the first of `heads` (sorted newest first)
    async fn remove_duplicate_heads(
        &self,
        entity_id: &str,
        heads: &[Edge],
    ) -> TrackResult<Vec<String>> {
        let mut removed = Vec::new();
        for stale in heads.iter().skip(1) {
            match self.ctx.store.delete_edge(&stale.id).await {
                Ok(()) => removed.push(stale.attrs.rev.clone()),
                // another repair got there first
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.ctx.metrics.add_heads_repaired(removed.len() as u64);
        log_event_with_fields(
            Event::HeadRepaired,
            &[("handle", entity_id), ("removed", &removed.join(","))],
        );
        Ok(removed)
    }

    async fn write_snapshot(
        &self,
        names: &CollectionNames,
        entity_id: &str,
        mut content: Map<String, Value>,
        at: DateTime<Utc>,
    ) -> TrackResult<Document> {
        let key = Uuid::new_v4().simple().to_string();
        content.insert(PARENT_FIELD.to_string(), Value::String(entity_id.to_string()));
        content.insert(CREATED_FIELD.to_string(), timestamp(at));
        Ok(self
            .ctx
            .store
            .create_document(&names.history, Some(&key), content)
            .await?)
    }

    /// Replace the entity document with the content of snapshot `rev`.
    ///
    /// Conditional on the entity's `_rev`. On a mismatch, retry against the
    /// fresh document only while `rev` is still the head; once a newer head
    /// exists its writer owns the entity and this write is dropped.
    async fn sync_entity(
        &self,
        names: &CollectionNames,
        existing: &Document,
        body: Map<String, Value>,
        rev: &str,
    ) -> TrackResult<Document> {
        let store = &self.ctx.store;
        let entity_id = document_id(existing)?;
        let mut expected = existing.rev().map(str::to_string);
        let attempts = self.ctx.config.max_conflict_retries + 1;

        for _ in 0..attempts {
            match store
                .replace_document(&entity_id, body.clone(), expected.as_deref())
                .await
            {
                Ok(doc) => return Ok(doc),
                Err(e) => {
                    let err = TrackError::from(e);
                    if !err.is_retryable() {
                        return Err(err);
                    }
                }
            }

            // read the entity before the head, so a newer writer's sync
            // always invalidates the `_rev` retried with
            let current = store.get_document(&entity_id).await?;
            let heads = self.heads(names, &entity_id).await?;
            if heads.first().map(|h| h.attrs.rev.as_str()) != Some(rev) {
                log_event_with_fields(
                    Event::EntitySuperseded,
                    &[("handle", &entity_id), ("rev", rev)],
                );
                return Ok(current);
            }
            expected = current.rev().map(str::to_string);
        }

        Err(TrackError::conflict(format!(
            "entity {} kept changing while applying revision {}",
            entity_id, rev
        )))
    }
}

/// Current time at the precision timestamps are stored with
fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn snapshot_key(snapshot: &Document) -> TrackResult<String> {
    snapshot
        .key()
        .map(str::to_string)
        .ok_or_else(|| TrackError::Store("store returned a snapshot without _key".to_string()))
}
