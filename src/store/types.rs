//! Store Types
//!
//! Documents, edges and edge queries as exchanged with a document/graph store.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding a document's full handle (`collection/key`)
pub const ID_FIELD: &str = "_id";
/// Field holding a document's key within its collection
pub const KEY_FIELD: &str = "_key";
/// Field holding the store-issued revision token
pub const REV_FIELD: &str = "_rev";

/// A stored document: a JSON object carrying `_id`, `_key` and `_rev`
/// alongside its caller fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Wrap a body as a document
    pub fn new(body: Map<String, Value>) -> Self {
        Self(body)
    }

    /// Build a document from a JSON value, which must be an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Document handle (`collection/key`)
    pub fn id(&self) -> Option<&str> {
        self.str_field(ID_FIELD)
    }

    /// Document key
    pub fn key(&self) -> Option<&str> {
        self.str_field(KEY_FIELD)
    }

    /// Store revision token
    pub fn rev(&self) -> Option<&str> {
        self.str_field(REV_FIELD)
    }

    /// Look up a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Look up a string field
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Set a field, returning the previous value
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Borrow the underlying object
    pub fn body(&self) -> &Map<String, Value> {
        &self.0
    }

}

impl From<Map<String, Value>> for Document {
    fn from(body: Map<String, Value>) -> Self {
        Self(body)
    }
}

/// Relation types in a revision graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    /// entity -> current snapshot; exactly one per live entity
    HeadRevision,
    /// entity -> every snapshot ever produced
    Revision,
    /// newer snapshot -> older snapshot
    PrevRevision,
}

impl EdgeKind {
    /// Wire name of the edge type
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::HeadRevision => "headRevision",
            EdgeKind::Revision => "revision",
            EdgeKind::PrevRevision => "prevRevision",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes carried by every revision-graph edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeAttrs {
    /// Edge type
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    /// Creation time of the revision this edge describes
    pub created: DateTime<Utc>,
    /// `-created` in epoch milliseconds; ascending order is newest first
    pub reverse_created: i64,
    /// Snapshot key this edge refers to
    pub rev: String,
    /// Entity handle, set on edges leaving an entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl EdgeAttrs {
    /// Create attributes, deriving `reverse_created` from `created`
    pub fn new(kind: EdgeKind, rev: impl Into<String>, created: DateTime<Utc>) -> Self {
        Self {
            kind,
            created,
            reverse_created: -created.timestamp_millis(),
            rev: rev.into(),
            parent: None,
        }
    }

    /// Attach the owning entity handle
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// A stored edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Edge handle (`edges_collection/key`)
    #[serde(rename = "_id")]
    pub id: String,
    /// Edge key
    #[serde(rename = "_key")]
    pub key: String,
    /// Store revision token
    #[serde(rename = "_rev")]
    pub rev_token: String,
    /// Source node handle
    #[serde(rename = "_from")]
    pub from: String,
    /// Target node handle
    #[serde(rename = "_to")]
    pub to: String,
    #[serde(flatten)]
    pub attrs: EdgeAttrs,
}

impl Edge {
    /// Edge type
    pub fn kind(&self) -> EdgeKind {
        self.attrs.kind
    }

    /// Key of the target node within its collection
    pub fn to_key(&self) -> &str {
        node_key(&self.to)
    }

    /// Key of the source node within its collection
    pub fn from_key(&self) -> &str {
        node_key(&self.from)
    }
}

fn node_key(handle: &str) -> &str {
    handle.split_once('/').map(|(_, key)| key).unwrap_or(handle)
}

/// Sort orders supported by edge queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSort {
    /// `reverse_created` ascending (newest first)
    ReverseCreatedAsc,
}

/// Order of store-issued keys: numeric keys compare by value
pub fn key_order(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Filtered, sorted, paginated edge lookup.
///
/// Filters are applied first, then the sort, then `skip`/`limit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub kind: Option<EdgeKind>,
    pub sort: Option<EdgeSort>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl EdgeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only edges leaving `handle`
    pub fn from(mut self, handle: impl Into<String>) -> Self {
        self.from = Some(handle.into());
        self
    }

    /// Only edges arriving at `handle`
    pub fn to(mut self, handle: impl Into<String>) -> Self {
        self.to = Some(handle.into());
        self
    }

    /// Only edges of one type
    pub fn kind(mut self, kind: EdgeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn sort(mut self, sort: EdgeSort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether an edge passes the filters
    pub fn matches(&self, edge: &Edge) -> bool {
        self.from.as_deref().map_or(true, |f| edge.from == f)
            && self.to.as_deref().map_or(true, |t| edge.to == t)
            && self.kind.map_or(true, |k| edge.attrs.kind == k)
    }

    /// Apply sort and pagination to already-filtered edges
    pub fn finish(&self, mut edges: Vec<Edge>) -> Vec<Edge> {
        match self.sort {
            // ties: later-issued key first, as for head selection
            Some(EdgeSort::ReverseCreatedAsc) => edges.sort_by(|a, b| {
                a.attrs
                    .reverse_created
                    .cmp(&b.attrs.reverse_created)
                    .then_with(|| key_order(&b.key, &a.key))
            }),
            None => {}
        }

        let iter = edges.into_iter().skip(self.skip);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}
