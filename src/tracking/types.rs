//! Tracking result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Document, Edge, EdgeKind};

/// Relation of a described revision to the node it was looked up from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RevisionKind {
    HeadRevision,
    Revision,
    PrevRevision,
    /// Reverse of `PrevRevision`; never stored, only reported by `next`
    NextRevision,
}

impl From<EdgeKind> for RevisionKind {
    fn from(kind: EdgeKind) -> Self {
        match kind {
            EdgeKind::HeadRevision => RevisionKind::HeadRevision,
            EdgeKind::Revision => RevisionKind::Revision,
            EdgeKind::PrevRevision => RevisionKind::PrevRevision,
        }
    }
}

/// A revision as seen by callers: edge attributes without store bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionDescriptor {
    #[serde(rename = "type")]
    pub kind: RevisionKind,
    /// Snapshot key
    pub rev: String,
    /// When the revision was written
    pub created: DateTime<Utc>,
    /// Entity handle, for descriptors reached from an entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl RevisionDescriptor {
    /// Describe the revision an edge carries
    pub fn from_edge(edge: &Edge) -> Self {
        Self {
            kind: edge.attrs.kind.into(),
            rev: edge.attrs.rev.clone(),
            created: edge.attrs.created,
            parent: edge.attrs.parent.clone(),
        }
    }
}

/// Pagination for revision listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub skip: usize,
    pub limit: Option<usize>,
}

impl ListOptions {
    pub fn page(skip: usize, limit: usize) -> Self {
        Self {
            skip,
            limit: Some(limit),
        }
    }
}

/// Everything written when a new entity is created
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedEntity {
    pub entity: Document,
    pub snapshot: Document,
    pub head_edge: Edge,
    pub revision_edge: Edge,
}

/// Everything written, and the head edge replaced, when a revision is appended
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevisedEntity {
    pub entity: Document,
    pub snapshot: Document,
    pub head_edge: Edge,
    pub previous_revision_edge: Edge,
    pub deleted_head_edge: Edge,
    pub revision_edge: Edge,
}

/// Result of saving one document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaveOutcome {
    Created(Box<CreatedEntity>),
    Revised(Box<RevisedEntity>),
    /// Content matched the current entity; nothing was written
    Unchanged { handle: String },
}

impl SaveOutcome {
    /// Entity handle the save addressed
    pub fn handle(&self) -> Option<&str> {
        match self {
            SaveOutcome::Created(c) => c.entity.id(),
            SaveOutcome::Revised(r) => r.entity.id(),
            SaveOutcome::Unchanged { handle } => Some(handle),
        }
    }

    /// Key of the snapshot written, if any
    pub fn rev(&self) -> Option<&str> {
        match self {
            SaveOutcome::Created(c) => Some(&c.head_edge.attrs.rev),
            SaveOutcome::Revised(r) => Some(&r.head_edge.attrs.rev),
            SaveOutcome::Unchanged { .. } => None,
        }
    }

    /// Whether anything was written
    pub fn is_changed(&self) -> bool {
        !matches!(self, SaveOutcome::Unchanged { .. })
    }
}

/// Keep only the saves that wrote something
pub fn changed(outcomes: Vec<SaveOutcome>) -> Vec<SaveOutcome> {
    outcomes.into_iter().filter(SaveOutcome::is_changed).collect()
}

/// Result of reconciling an entity's head pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub handle: String,
    /// Head edge kept, if any head existed
    pub kept: Option<RevisionDescriptor>,
    /// Snapshot keys of the duplicate heads removed
    pub removed: Vec<String>,
    /// A lost head was recreated from the newest revision edge
    pub restored: bool,
}

impl RepairReport {
    /// Nothing needed fixing
    pub fn is_clean(&self) -> bool {
        self.removed.is_empty() && !self.restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EdgeAttrs;
    use chrono::TimeZone;

    #[test]
    fn test_descriptor_drops_bookkeeping() {
        let created = Utc.timestamp_millis_opt(5_000).single().unwrap();
        let edge = Edge {
            id: "c_edges/9".to_string(),
            key: "9".to_string(),
            rev_token: "_3".to_string(),
            from: "c/k".to_string(),
            to: "c_history/r1".to_string(),
            attrs: EdgeAttrs::new(EdgeKind::HeadRevision, "r1", created).with_parent("c/k"),
        };

        let value = serde_json::to_value(RevisionDescriptor::from_edge(&edge)).unwrap();
        let fields: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(value["type"], "headRevision");
        assert_eq!(value["rev"], "r1");
        assert_eq!(value["parent"], "c/k");
        for hidden in ["_id", "_key", "_rev", "_from", "_to", "reverse_created"] {
            assert!(!fields.contains(&hidden), "{}", hidden);
        }
    }

    #[test]
    fn test_next_revision_wire_name() {
        assert_eq!(
            serde_json::to_value(RevisionKind::NextRevision).unwrap(),
            "nextRevision"
        );
    }

    #[test]
    fn test_changed_filters_unchanged() {
        let outcomes = vec![SaveOutcome::Unchanged {
            handle: "c/k".to_string(),
        }];
        assert!(changed(outcomes).is_empty());
    }
}
