//! Revision Chain Tests
//!
//! Tests for the shape of an entity's history:
//! - Create writes one snapshot, one head edge, one revision edge
//! - N distinct writes give N snapshots and a linear chain of N-1 links
//! - Unchanged writes produce nothing
//! - next/previous are inverses along the chain
//! - Snapshots never change after they are written

use std::sync::Arc;

use serde_json::{json, Map, Value};
use trackdb::store::{EdgeKind, MemoryStore};
use trackdb::tracking::{ListOptions, RevisionKind, SaveOutcome, Tracker};

// =============================================================================
// Test Utilities
// =============================================================================

fn setup() -> (Arc<MemoryStore>, Tracker) {
    let store = Arc::new(MemoryStore::new());
    let tracker = Tracker::new(store.clone()).unwrap();
    (store, tracker)
}

fn content(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn edge_count(store: &MemoryStore, kind: EdgeKind) -> usize {
    store
        .edges("docs_edges")
        .unwrap()
        .iter()
        .filter(|e| e.kind() == kind)
        .count()
}

/// Saves `v = 0..n` under docs/k and returns the snapshot keys, oldest first
async fn write_versions(tracker: &Tracker, n: usize) -> Vec<String> {
    let mut revs = Vec::new();
    for v in 0..n {
        let outcome = tracker
            .save("docs", json!({"_key": "k", "v": v}))
            .await
            .unwrap();
        revs.push(outcome.rev().unwrap().to_string());
    }
    revs
}

// =============================================================================
// Example Scenario
// =============================================================================

#[tokio::test]
async fn test_create_then_revise_scenario() {
    let (_, tracker) = setup();

    let first = tracker
        .save("docs", json!({"_key": "K", "name": "test data"}))
        .await
        .unwrap();
    assert!(matches!(first, SaveOutcome::Created(_)));
    assert_eq!(tracker.list("docs/K", ListOptions::default()).await.unwrap().len(), 1);

    let latest = tracker.latest("docs/K").await.unwrap();
    assert_eq!(latest.kind, RevisionKind::HeadRevision);
    assert_eq!(latest.parent.as_deref(), Some("docs/K"));
    let first_rev = latest.rev;

    tracker
        .save("docs", json!({"_key": "K", "name": "test data change"}))
        .await
        .unwrap();
    assert_eq!(tracker.list("docs/K", ListOptions::default()).await.unwrap().len(), 2);

    let latest = tracker.latest("docs/K").await.unwrap();
    assert_ne!(latest.rev, first_rev);

    assert_eq!(tracker.previous("docs", &latest.rev).await.unwrap().rev, first_rev);
    assert_eq!(tracker.next("docs", &first_rev).await.unwrap().rev, latest.rev);
    assert!(tracker.previous("docs", &first_rev).await.unwrap_err().is_not_found());
    assert!(tracker.next("docs", &latest.rev).await.unwrap_err().is_not_found());
}

// =============================================================================
// Chain Shape
// =============================================================================

#[tokio::test]
async fn test_create_writes_one_of_each() {
    let (store, tracker) = setup();
    let rev = write_versions(&tracker, 1).await.remove(0);

    assert_eq!(store.document_count("docs_history").unwrap(), 1);
    assert_eq!(edge_count(&store, EdgeKind::HeadRevision), 1);
    assert_eq!(edge_count(&store, EdgeKind::Revision), 1);
    assert_eq!(edge_count(&store, EdgeKind::PrevRevision), 0);
    assert_eq!(tracker.get("docs", &rev).await.unwrap(), content(json!({"v": 0})));
}

#[tokio::test]
async fn test_n_writes_form_linear_chain() {
    let (store, tracker) = setup();
    let revs = write_versions(&tracker, 6).await;

    assert_eq!(store.document_count("docs_history").unwrap(), 6);
    assert_eq!(edge_count(&store, EdgeKind::Revision), 6);
    assert_eq!(edge_count(&store, EdgeKind::PrevRevision), 5);
    assert_eq!(edge_count(&store, EdgeKind::HeadRevision), 1);

    let listed: Vec<String> = tracker
        .list("docs/k", ListOptions::default())
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.rev)
        .collect();
    let newest_first: Vec<String> = revs.iter().rev().cloned().collect();
    assert_eq!(listed, newest_first);

    let page = tracker.list("docs/k", ListOptions::page(2, 3)).await.unwrap();
    let paged: Vec<&str> = page.iter().map(|d| d.rev.as_str()).collect();
    assert_eq!(paged, vec![revs[3].as_str(), revs[2].as_str(), revs[1].as_str()]);

    let listing = tracker.list("docs/k", ListOptions::default()).await.unwrap();
    assert!(listing.windows(2).all(|w| w[0].created > w[1].created));
}

#[tokio::test]
async fn test_unchanged_write_produces_nothing() {
    let (store, tracker) = setup();
    tracker
        .save("docs", json!({"_key": "k", "name": "a", "description": "d"}))
        .await
        .unwrap();

    let same = tracker
        .save("docs", json!({"_key": "k", "name": "a", "description": "d"}))
        .await
        .unwrap();
    let subset = tracker
        .save("docs", json!({"_key": "k", "description": "d"}))
        .await
        .unwrap();
    let system_only = tracker
        .save(
            "docs",
            json!({"_key": "k", "_rev": "_stale", "_modified": "2001-01-01T00:00:00.000Z", "name": "a"}),
        )
        .await
        .unwrap();

    for outcome in [same, subset, system_only] {
        assert!(!outcome.is_changed());
    }
    assert_eq!(store.document_count("docs_history").unwrap(), 1);
    assert_eq!(store.edges("docs_edges").unwrap().len(), 2);
    assert_eq!(tracker.metrics().snapshot().writes_unchanged, 3);
}

// =============================================================================
// Navigation
// =============================================================================

#[tokio::test]
async fn test_next_and_previous_are_inverse() {
    let (_, tracker) = setup();
    let revs = write_versions(&tracker, 5).await;

    for rev in &revs[1..] {
        let previous = tracker.previous("docs", rev).await.unwrap();
        assert_eq!(previous.kind, RevisionKind::PrevRevision);
        assert_eq!(&tracker.next("docs", &previous.rev).await.unwrap().rev, rev);
    }
    for rev in &revs[..revs.len() - 1] {
        let next = tracker.next("docs", rev).await.unwrap();
        assert_eq!(next.kind, RevisionKind::NextRevision);
        assert_eq!(&tracker.previous("docs", &next.rev).await.unwrap().rev, rev);
    }

    assert!(tracker.previous("docs", &revs[0]).await.unwrap_err().is_not_found());
    assert!(tracker.next("docs", &revs[4]).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_snapshots_are_immutable() {
    let (_, tracker) = setup();
    tracker
        .save("docs", json!({"_key": "k", "name": "first", "tags": ["a"]}))
        .await
        .unwrap();
    let first = tracker.latest("docs/k").await.unwrap().rev;

    tracker
        .save("docs", json!({"_key": "k", "name": "second"}))
        .await
        .unwrap();
    tracker
        .save("docs", json!({"_key": "k", "name": "third", "tags": ["b"]}))
        .await
        .unwrap();

    assert_eq!(
        tracker.get("docs", &first).await.unwrap(),
        content(json!({"name": "first", "tags": ["a"]}))
    );
}

#[tokio::test]
async fn test_histories_of_different_entities_do_not_mix() {
    let (_, tracker) = setup();
    tracker.save("docs", json!({"_key": "a", "v": 1})).await.unwrap();
    tracker.save("docs", json!({"_key": "b", "v": 1})).await.unwrap();
    tracker.save("docs", json!({"_key": "a", "v": 2})).await.unwrap();

    assert_eq!(tracker.list("docs/a", ListOptions::default()).await.unwrap().len(), 2);
    assert_eq!(tracker.list("docs/b", ListOptions::default()).await.unwrap().len(), 1);

    let b_head = tracker.latest("docs/b").await.unwrap().rev;
    assert!(tracker.next("docs", &b_head).await.unwrap_err().is_not_found());
    assert!(tracker.previous("docs", &b_head).await.unwrap_err().is_not_found());
}
