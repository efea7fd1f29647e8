//! In-memory store
//!
//! A `DocumentStore` backed by maps behind a single `RwLock`. Every
//! operation takes the lock once, so each call is atomic; nothing spans
//! calls. The whole state can be written to and read back from a JSON file.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};
use super::types::{Document, Edge, EdgeAttrs, EdgeQuery, ID_FIELD, KEY_FIELD, REV_FIELD};
use super::{DocumentStore, StoreFuture};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    documents: HashMap<String, BTreeMap<String, Document>>,
    edges: HashMap<String, BTreeMap<String, Edge>>,
    next_key: u64,
    next_rev: u64,
}

impl StoreState {
    /// Next numeric key not already taken in `collection`
    fn issue_key(&mut self, collection: &str) -> String {
        loop {
            self.next_key += 1;
            let key = self.next_key.to_string();
            let taken = self
                .documents
                .get(collection)
                .map_or(false, |c| c.contains_key(&key))
                || self
                    .edges
                    .get(collection)
                    .map_or(false, |c| c.contains_key(&key));
            if !taken {
                return key;
            }
        }
    }

    fn issue_rev(&mut self) -> String {
        self.next_rev += 1;
        format!("_{:x}", self.next_rev)
    }

    fn insert_edge(&mut self, collection: &str, from: &str, to: &str, attrs: EdgeAttrs) -> Edge {
        let key = self.issue_key(collection);
        let edge = Edge {
            id: format!("{}/{}", collection, key),
            key: key.clone(),
            rev_token: self.issue_rev(),
            from: from.to_string(),
            to: to.to_string(),
            attrs,
        };
        self.edges
            .entry(collection.to_string())
            .or_default()
            .insert(key, edge.clone());
        edge
    }
}

/// In-memory document/graph store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store previously written with [`MemoryStore::save`].
    /// A missing file yields an empty store.
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let state: StoreState = serde_json::from_str(&content)?;
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Write the whole store to `path` as JSON
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let state = self.read()?;
        let content = serde_json::to_string_pretty(&*state)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Number of documents in a collection
    pub fn document_count(&self, collection: &str) -> StoreResult<usize> {
        Ok(self
            .read()?
            .documents
            .get(collection)
            .map_or(0, BTreeMap::len))
    }

    /// All edges of a collection, in key order
    pub fn edges(&self, collection: &str) -> StoreResult<Vec<Edge>> {
        Ok(self
            .read()?
            .edges
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))
    }

    fn create_document_sync(
        &self,
        collection: &str,
        key: Option<&str>,
        mut body: Map<String, Value>,
    ) -> StoreResult<Document> {
        if collection.is_empty() || collection.contains('/') {
            return Err(StoreError::InvalidHandle(collection.to_string()));
        }
        let mut state = self.write()?;

        let key = match key {
            Some(k) if k.is_empty() || k.contains('/') => {
                return Err(StoreError::InvalidHandle(format!("{}/{}", collection, k)))
            }
            Some(k) => k.to_string(),
            None => state.issue_key(collection),
        };
        let handle = format!("{}/{}", collection, key);

        if state
            .documents
            .get(collection)
            .map_or(false, |c| c.contains_key(&key))
        {
            return Err(StoreError::Conflict(format!(
                "unique constraint violated: {}",
                handle
            )));
        }

        body.insert(ID_FIELD.to_string(), Value::String(handle));
        body.insert(KEY_FIELD.to_string(), Value::String(key.clone()));
        body.insert(REV_FIELD.to_string(), Value::String(state.issue_rev()));

        let doc = Document::new(body);
        state
            .documents
            .entry(collection.to_string())
            .or_default()
            .insert(key, doc.clone());
        Ok(doc)
    }

    fn get_document_sync(&self, handle: &str) -> StoreResult<Document> {
        let (collection, key) = split_handle(handle)?;
        let state = self.read()?;
        state
            .documents
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))
    }

    fn replace_document_sync(
        &self,
        handle: &str,
        mut body: Map<String, Value>,
        if_rev: Option<&str>,
    ) -> StoreResult<Document> {
        let (collection, key) = split_handle(handle)?;
        let mut state = self.write()?;
        let rev = state.issue_rev();

        let docs = state
            .documents
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let slot = docs
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;

        if let Some(expected) = if_rev {
            if slot.rev() != Some(expected) {
                return Err(StoreError::Conflict(format!(
                    "revision mismatch on {}: expected {}, found {}",
                    handle,
                    expected,
                    slot.rev().unwrap_or("none")
                )));
            }
        }

        body.insert(ID_FIELD.to_string(), Value::String(handle.to_string()));
        body.insert(KEY_FIELD.to_string(), Value::String(key.to_string()));
        body.insert(REV_FIELD.to_string(), Value::String(rev));
        *slot = Document::new(body);
        Ok(slot.clone())
    }

    fn delete_document_sync(&self, handle: &str) -> StoreResult<()> {
        let (collection, key) = split_handle(handle)?;
        let mut state = self.write()?;
        state
            .documents
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))
    }

    fn create_edge_sync(
        &self,
        collection: &str,
        from: &str,
        to: &str,
        attrs: EdgeAttrs,
    ) -> StoreResult<Edge> {
        split_handle(from)?;
        split_handle(to)?;
        let mut state = self.write()?;
        Ok(state.insert_edge(collection, from, to, attrs))
    }

    fn delete_edge_sync(&self, handle: &str) -> StoreResult<()> {
        let (collection, key) = split_handle(handle)?;
        let mut state = self.write()?;
        state
            .edges
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))
    }

    fn swap_edge_sync(
        &self,
        expected: &str,
        collection: &str,
        from: &str,
        to: &str,
        attrs: EdgeAttrs,
    ) -> StoreResult<Edge> {
        let (expected_collection, expected_key) = split_handle(expected)?;
        split_handle(from)?;
        split_handle(to)?;
        let mut state = self.write()?;

        let removed = state
            .edges
            .get_mut(expected_collection)
            .and_then(|c| c.remove(expected_key));
        if removed.is_none() {
            return Err(StoreError::Conflict(format!(
                "edge {} was replaced concurrently",
                expected
            )));
        }

        Ok(state.insert_edge(collection, from, to, attrs))
    }

    fn query_edges_sync(&self, collection: &str, query: &EdgeQuery) -> StoreResult<Vec<Edge>> {
        let state = self.read()?;
        let matched: Vec<Edge> = state
            .edges
            .get(collection)
            .map(|c| c.values().filter(|e| query.matches(e)).cloned().collect())
            .unwrap_or_default();
        Ok(query.finish(matched))
    }
}

fn split_handle(handle: &str) -> StoreResult<(&str, &str)> {
    match handle.split_once('/') {
        Some((c, k)) if !c.is_empty() && !k.is_empty() && !k.contains('/') => Ok((c, k)),
        _ => Err(StoreError::InvalidHandle(handle.to_string())),
    }
}

impl DocumentStore for MemoryStore {
    fn create_document<'a>(
        &'a self,
        collection: &'a str,
        key: Option<&'a str>,
        body: Map<String, Value>,
    ) -> StoreFuture<'a, Document> {
        Box::pin(async move { self.create_document_sync(collection, key, body) })
    }

    fn get_document<'a>(&'a self, handle: &'a str) -> StoreFuture<'a, Document> {
        Box::pin(async move { self.get_document_sync(handle) })
    }

    fn replace_document<'a>(
        &'a self,
        handle: &'a str,
        body: Map<String, Value>,
        if_rev: Option<&'a str>,
    ) -> StoreFuture<'a, Document> {
        Box::pin(async move { self.replace_document_sync(handle, body, if_rev) })
    }

    fn delete_document<'a>(&'a self, handle: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.delete_document_sync(handle) })
    }

    fn create_edge<'a>(
        &'a self,
        collection: &'a str,
        from: &'a str,
        to: &'a str,
        attrs: EdgeAttrs,
    ) -> StoreFuture<'a, Edge> {
        Box::pin(async move { self.create_edge_sync(collection, from, to, attrs) })
    }

    fn delete_edge<'a>(&'a self, handle: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.delete_edge_sync(handle) })
    }

    fn swap_edge<'a>(
        &'a self,
        expected: &'a str,
        collection: &'a str,
        from: &'a str,
        to: &'a str,
        attrs: EdgeAttrs,
    ) -> StoreFuture<'a, Edge> {
        Box::pin(async move { self.swap_edge_sync(expected, collection, from, to, attrs) })
    }

    fn query_edges<'a>(
        &'a self,
        collection: &'a str,
        query: EdgeQuery,
    ) -> StoreFuture<'a, Vec<Edge>> {
        Box::pin(async move { self.query_edges_sync(collection, &query) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EdgeKind;
    use chrono::Utc;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_generated_keys_skip_caller_keys() {
        let store = MemoryStore::new();
        store
            .create_document("docs", Some("1"), body(json!({"v": 1})))
            .await
            .unwrap();
        store
            .create_document("docs", Some("3"), body(json!({"v": 3})))
            .await
            .unwrap();

        let mut keys = Vec::new();
        for _ in 0..3 {
            let doc = store
                .create_document("docs", None, body(json!({})))
                .await
                .unwrap();
            keys.push(doc.key().unwrap().to_string());
        }
        assert_eq!(keys, vec!["2", "4", "5"]);
        assert_eq!(store.document_count("docs").unwrap(), 5);
    }

    #[tokio::test]
    async fn test_create_assigns_system_fields() {
        let store = MemoryStore::new();
        let doc = store
            .create_document("users", Some("alice"), body(json!({"name": "Alice"})))
            .await
            .unwrap();
        assert_eq!(doc.id(), Some("users/alice"));
        assert_eq!(doc.key(), Some("alice"));
        assert!(doc.rev().is_some());

        let generated = store
            .create_document("users", None, body(json!({"name": "Bob"})))
            .await
            .unwrap();
        assert!(generated.key().unwrap().parse::<u64>().is_ok());
    }

    #[tokio::test]
    async fn test_create_duplicate_key_conflicts() {
        let store = MemoryStore::new();
        store
            .create_document("users", Some("a"), Map::new())
            .await
            .unwrap();
        let err = store
            .create_document("users", Some("a"), Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_missing_distinguishes_collection() {
        let store = MemoryStore::new();
        store
            .create_document("users", Some("a"), Map::new())
            .await
            .unwrap();

        let err = store.get_document("users/missing").await.unwrap_err();
        assert_eq!(err.error_num(), 1202);
        let err = store.get_document("nothing/missing").await.unwrap_err();
        assert_eq!(err.error_num(), 1203);
        let err = store.get_document("no-slash").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidHandle(_)));
    }

    #[tokio::test]
    async fn test_conditional_replace() {
        let store = MemoryStore::new();
        let doc = store
            .create_document("users", Some("a"), body(json!({"v": 1})))
            .await
            .unwrap();
        let rev = doc.rev().unwrap().to_string();

        let replaced = store
            .replace_document("users/a", body(json!({"v": 2})), Some(&rev))
            .await
            .unwrap();
        assert_ne!(replaced.rev(), Some(rev.as_str()));
        assert_eq!(replaced.get("v"), Some(&json!(2)));

        let err = store
            .replace_document("users/a", body(json!({"v": 3})), Some(&rev))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_swap_edge_is_conditional() {
        let store = MemoryStore::new();
        let attrs = EdgeAttrs::new(EdgeKind::HeadRevision, "r1", Utc::now());
        let old = store
            .create_edge("c_edges", "c/a", "c_history/r1", attrs.clone())
            .await
            .unwrap();

        let new = store
            .swap_edge(&old.id, "c_edges", "c/a", "c_history/r2", attrs.clone())
            .await
            .unwrap();
        assert_eq!(store.edges("c_edges").unwrap(), vec![new]);

        let err = store
            .swap_edge(&old.id, "c_edges", "c/a", "c_history/r3", attrs)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.edges("c_edges").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::new();
        store
            .create_document("users", Some("a"), body(json!({"v": 1})))
            .await
            .unwrap();
        store.save(&path).unwrap();

        let loaded = MemoryStore::load(&path).unwrap();
        let doc = loaded.get_document("users/a").await.unwrap();
        assert_eq!(doc.get("v"), Some(&json!(1)));

        // counters survive, so fresh keys do not collide
        let fresh = loaded.create_document("users", None, Map::new()).await.unwrap();
        assert_ne!(fresh.key(), Some("a"));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(store.document_count("users").unwrap(), 0);
    }
}
