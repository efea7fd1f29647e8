//! Revision reader
//!
//! Navigation over the revision graph. Reads never write; a duplicated head
//! is tolerated and reported, left for [`RevisionWriter::repair_head`].
//!
//! [`RevisionWriter::repair_head`]: super::writer::RevisionWriter::repair_head

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::observability::{log_event_with_fields, Event};
use crate::store::{Document, EdgeKind, EdgeQuery, EdgeSort};

use super::context::{parse_timestamp, TrackContext, CREATED_FIELD, PARENT_FIELD};
use super::errors::{TrackError, TrackResult};
use super::handle::{CollectionNames, Handle};
use super::types::{ListOptions, RevisionDescriptor, RevisionKind};
use super::writer::head_order;

/// Reads revision history
#[derive(Debug, Clone)]
pub struct RevisionReader {
    ctx: Arc<TrackContext>,
}

impl RevisionReader {
    pub fn new(ctx: Arc<TrackContext>) -> Self {
        Self { ctx }
    }

    /// Revisions of an entity, newest first
    pub async fn list(&self, handle: &str, options: ListOptions) -> TrackResult<Vec<RevisionDescriptor>> {
        let (handle, names) = self.resolve(handle)?;
        self.entity(&handle).await?;

        let mut query = EdgeQuery::new()
            .from(handle.to_string())
            .kind(EdgeKind::Revision)
            .sort(EdgeSort::ReverseCreatedAsc)
            .skip(options.skip);
        if let Some(limit) = options.limit {
            query = query.limit(limit);
        }

        let edges = self.ctx.store.query_edges(&names.edges, query).await?;
        Ok(edges.iter().map(RevisionDescriptor::from_edge).collect())
    }

    /// Content of one snapshot, without system fields
    pub async fn get(&self, collection: &str, rev: &str) -> TrackResult<Map<String, Value>> {
        let names = self.ctx.names(collection)?;
        let snapshot = self.snapshot(&names, rev).await?;
        Ok(self.ctx.detector.strip(snapshot.body()))
    }

    /// Current head of an entity
    pub async fn latest(&self, handle: &str) -> TrackResult<RevisionDescriptor> {
        let (handle, names) = self.resolve(handle)?;
        self.entity(&handle).await?;

        let heads = self
            .ctx
            .store
            .query_edges(
                &names.edges,
                EdgeQuery::new()
                    .from(handle.to_string())
                    .kind(EdgeKind::HeadRevision),
            )
            .await?;

        if heads.len() > 1 {
            log_event_with_fields(
                Event::HeadDuplicated,
                &[("handle", &handle.to_string()), ("count", &heads.len().to_string())],
            );
        }

        heads
            .iter()
            .max_by(|a, b| head_order(a, b))
            .map(RevisionDescriptor::from_edge)
            .ok_or_else(|| TrackError::not_found(format!("head revision of {}", handle)))
    }

    /// The revision written right after `rev`
    pub async fn next(&self, collection: &str, rev: &str) -> TrackResult<RevisionDescriptor> {
        let names = self.ctx.names(collection)?;
        let snapshot = self.snapshot(&names, rev).await?;
        let snapshot_id = names.snapshot_handle(rev)?.to_string();

        let newer = self
            .ctx
            .store
            .query_edges(
                &names.edges,
                EdgeQuery::new()
                    .to(snapshot_id)
                    .kind(EdgeKind::PrevRevision)
                    .limit(1),
            )
            .await?;
        let edge = newer
            .first()
            .ok_or_else(|| TrackError::not_found(format!("revision after {}", rev)))?;

        let newer_snapshot = self.snapshot(&names, edge.from_key()).await?;
        let created = parse_timestamp(newer_snapshot.get(CREATED_FIELD)).ok_or_else(|| {
            TrackError::integrity(format!("snapshot {} has no creation time", edge.from))
        })?;

        Ok(RevisionDescriptor {
            kind: RevisionKind::NextRevision,
            rev: edge.from_key().to_string(),
            created,
            parent: parent_of(&newer_snapshot).or_else(|| parent_of(&snapshot)),
        })
    }

    /// The revision `rev` replaced
    pub async fn previous(&self, collection: &str, rev: &str) -> TrackResult<RevisionDescriptor> {
        let names = self.ctx.names(collection)?;
        let snapshot = self.snapshot(&names, rev).await?;
        let snapshot_id = names.snapshot_handle(rev)?.to_string();

        let older = self
            .ctx
            .store
            .query_edges(
                &names.edges,
                EdgeQuery::new()
                    .from(snapshot_id)
                    .kind(EdgeKind::PrevRevision)
                    .limit(1),
            )
            .await?;
        let edge = older
            .first()
            .ok_or_else(|| TrackError::not_found(format!("revision before {}", rev)))?;

        Ok(RevisionDescriptor {
            kind: RevisionKind::PrevRevision,
            rev: edge.to_key().to_string(),
            created: edge.attrs.created,
            parent: parent_of(&snapshot),
        })
    }

    fn resolve(&self, handle: &str) -> TrackResult<(Handle, CollectionNames)> {
        let handle = Handle::parse(handle)?;
        let names = self.ctx.names(handle.collection())?;
        Ok((handle, names))
    }

    async fn entity(&self, handle: &Handle) -> TrackResult<Document> {
        Ok(self.ctx.store.get_document(&handle.to_string()).await?)
    }

    async fn snapshot(&self, names: &CollectionNames, rev: &str) -> TrackResult<Document> {
        let handle = names.snapshot_handle(rev)?;
        Ok(self.ctx.store.get_document(&handle.to_string()).await?)
    }
}

fn parent_of(snapshot: &Document) -> Option<String> {
    snapshot.str_field(PARENT_FIELD).map(str::to_string)
}
