//! Document/graph store contract for trackdb
//!
//! Revision tracking is layered on a store that offers document lookup,
//! conditional writes, typed edges and filtered/sorted edge queries. The
//! store itself is an external collaborator; `MemoryStore` is the in-process
//! implementation used by tests and the command-line tool.
//!
//! # Guarantees required from an implementation
//!
//! - Single-document operations are atomic
//! - `swap_edge` removes the expected edge and inserts its replacement as one step
//! - `replace_document` with `if_rev` fails with `Conflict` on a revision mismatch
//! - No multi-document transactions are assumed

mod errors;
mod memory;
mod types;

use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use types::{
    key_order, Document, Edge, EdgeAttrs, EdgeKind, EdgeQuery, EdgeSort, ID_FIELD, KEY_FIELD,
    REV_FIELD,
};

/// Boxed future returned by store operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Capabilities required from the underlying document/graph store
pub trait DocumentStore: Send + Sync {
    /// Create a document; `key` of `None` lets the store pick one.
    /// Fails with `Conflict` when the key is taken.
    fn create_document<'a>(
        &'a self,
        collection: &'a str,
        key: Option<&'a str>,
        body: Map<String, Value>,
    ) -> StoreFuture<'a, Document>;

    /// Fetch a document by handle
    fn get_document<'a>(&'a self, handle: &'a str) -> StoreFuture<'a, Document>;

    /// Replace a document's body, keeping its key. With `if_rev`, fails
    /// with `Conflict` unless the stored revision token matches.
    fn replace_document<'a>(
        &'a self,
        handle: &'a str,
        body: Map<String, Value>,
        if_rev: Option<&'a str>,
    ) -> StoreFuture<'a, Document>;

    /// Delete a document
    fn delete_document<'a>(&'a self, handle: &'a str) -> StoreFuture<'a, ()>;

    /// Create an edge `from -> to`
    fn create_edge<'a>(
        &'a self,
        collection: &'a str,
        from: &'a str,
        to: &'a str,
        attrs: EdgeAttrs,
    ) -> StoreFuture<'a, Edge>;

    /// Delete an edge
    fn delete_edge<'a>(&'a self, handle: &'a str) -> StoreFuture<'a, ()>;

    /// Atomically replace edge `expected` by a new edge `from -> to`.
    /// Fails with `Conflict`, writing nothing, if `expected` no longer exists.
    fn swap_edge<'a>(
        &'a self,
        expected: &'a str,
        collection: &'a str,
        from: &'a str,
        to: &'a str,
        attrs: EdgeAttrs,
    ) -> StoreFuture<'a, Edge>;

    /// Query edges of one collection
    fn query_edges<'a>(&'a self, collection: &'a str, query: EdgeQuery)
        -> StoreFuture<'a, Vec<Edge>>;
}
