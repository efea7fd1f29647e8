//! Handle resolution
//!
//! Entities and snapshots are addressed as `"<collection>/<key>"`. Each
//! tracked collection owns a snapshot collection, an edge collection and a
//! graph grouping whose names derive from the base name.

use std::fmt;

use super::config::TrackerConfig;
use super::errors::{TrackError, TrackResult};

/// A parsed `collection/key` address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    collection: String,
    key: String,
}

impl Handle {
    /// Build a handle from its parts
    pub fn new(collection: impl Into<String>, key: impl Into<String>) -> TrackResult<Self> {
        let collection = collection.into();
        let key = key.into();
        if collection.is_empty() || collection.contains('/') {
            return Err(TrackError::validation(format!(
                "invalid collection name '{}'",
                collection
            )));
        }
        if key.is_empty() || key.contains('/') {
            return Err(TrackError::validation(format!("invalid key '{}'", key)));
        }
        Ok(Self { collection, key })
    }

    /// Parse `collection/key`
    pub fn parse(handle: &str) -> TrackResult<Self> {
        match handle.split_once('/') {
            Some((collection, key)) => Self::new(collection, key),
            None => Err(TrackError::validation(format!(
                "handle '{}' is missing '/'",
                handle
            ))),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.key)
    }
}

/// Names of the collections backing one tracked collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNames {
    /// Entity documents
    pub entity: String,
    /// Immutable snapshots
    pub history: String,
    /// Revision graph edges
    pub edges: String,
    /// Graph grouping entity + history through edges
    pub graph: String,
}

impl CollectionNames {
    /// Derive names with the default suffixes
    pub fn for_collection(collection: &str) -> TrackResult<Self> {
        Self::resolve(collection, &TrackerConfig::default())
    }

    /// Derive names using the configured suffixes
    pub fn resolve(collection: &str, config: &TrackerConfig) -> TrackResult<Self> {
        if collection.is_empty() || collection.contains('/') {
            return Err(TrackError::validation(format!(
                "invalid collection name '{}'",
                collection
            )));
        }
        Ok(Self {
            entity: collection.to_string(),
            history: format!("{}{}", collection, config.history_suffix),
            edges: format!("{}{}", collection, config.edges_suffix),
            graph: format!("{}{}", collection, config.graph_suffix),
        })
    }

    /// Handle of a snapshot in this collection's history
    pub fn snapshot_handle(&self, rev: &str) -> TrackResult<Handle> {
        Handle::new(self.history.clone(), rev)
    }

    /// Handle of an entity in this collection
    pub fn entity_handle(&self, key: &str) -> TrackResult<Handle> {
        Handle::new(self.entity.clone(), key)
    }
}
