//! Metrics registry for trackdb
//!
//! - Counters only
//! - Monotonic increase
//! - One registry per tracker, shared by its reader and writer

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for tracked writes and revision-graph maintenance
///
/// Uses Relaxed ordering; counters are independent of each other.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Entities created
    entities_created: AtomicU64,
    /// Revisions appended
    revisions_appended: AtomicU64,
    /// Writes classified as no-ops
    writes_unchanged: AtomicU64,
    /// Head swaps lost to another writer
    head_conflicts: AtomicU64,
    /// Conflicting writes retried
    write_retries: AtomicU64,
    /// Duplicate head edges removed
    heads_repaired: AtomicU64,
    /// Entity documents deleted
    entities_deleted: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_entities_created(&self) {
        self.entities_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_revisions_appended(&self) {
        self.revisions_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_writes_unchanged(&self) {
        self.writes_unchanged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_head_conflicts(&self) {
        self.head_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_write_retries(&self) {
        self.write_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Add the number of duplicate heads removed by one repair
    pub fn add_heads_repaired(&self, count: u64) {
        self.heads_repaired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_entities_deleted(&self) {
        self.entities_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            entities_created: self.entities_created.load(Ordering::Relaxed),
            revisions_appended: self.revisions_appended.load(Ordering::Relaxed),
            writes_unchanged: self.writes_unchanged.load(Ordering::Relaxed),
            head_conflicts: self.head_conflicts.load(Ordering::Relaxed),
            write_retries: self.write_retries.load(Ordering::Relaxed),
            heads_repaired: self.heads_repaired.load(Ordering::Relaxed),
            entities_deleted: self.entities_deleted.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub entities_created: u64,
    pub revisions_appended: u64,
    pub writes_unchanged: u64,
    pub head_conflicts: u64,
    pub write_retries: u64,
    pub heads_repaired: u64,
    pub entities_deleted: u64,
}
