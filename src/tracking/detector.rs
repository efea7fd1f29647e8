//! Change detection
//!
//! Decides whether a write creates an entity, appends a revision, or does
//! nothing. Only the fields both documents share take part in the
//! comparison, and system-managed fields never do.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::store::Document;

/// Classification of an incoming write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteClass {
    /// No entity exists yet
    Create,
    /// Entity exists and shared content differs
    Revise,
    /// Entity exists and shared content is identical
    NoOp,
}

/// Compares incoming fields with the current entity
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    system_fields: HashSet<String>,
}

impl ChangeDetector {
    /// Create a detector ignoring the given fields
    pub fn new<I, S>(system_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            system_fields: system_fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a field is system-managed
    pub fn is_system_field(&self, field: &str) -> bool {
        self.system_fields.contains(field)
    }

    /// Classify a write against the existing entity, if any
    pub fn classify(&self, existing: Option<&Document>, incoming: &Map<String, Value>) -> WriteClass {
        let existing = match existing {
            Some(doc) => doc.body(),
            None => return WriteClass::Create,
        };

        let changed = existing
            .iter()
            .filter(|(field, _)| !self.is_system_field(field))
            .filter_map(|(field, old)| incoming.get(field).map(|new| (old, new)))
            .any(|(old, new)| old != new);

        if changed {
            WriteClass::Revise
        } else {
            WriteClass::NoOp
        }
    }

    /// Copy of `body` without system-managed fields
    pub fn strip(&self, body: &Map<String, Value>) -> Map<String, Value> {
        body.iter()
            .filter(|(field, _)| !self.is_system_field(field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::TrackerConfig;
    use serde_json::json;

    fn detector() -> ChangeDetector {
        ChangeDetector::new(TrackerConfig::default().system_fields)
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn test_absent_is_create() {
        assert_eq!(
            detector().classify(None, &map(json!({"name": "x"}))),
            WriteClass::Create
        );
    }

    #[test]
    fn test_changed_shared_field_is_revise() {
        let existing = doc(json!({"_key": "k", "name": "a", "description": "d"}));
        let incoming = map(json!({"_key": "k", "description": "changed"}));
        assert_eq!(detector().classify(Some(&existing), &incoming), WriteClass::Revise);
    }

    #[test]
    fn test_subset_with_equal_values_is_noop() {
        let existing = doc(json!({"_key": "k", "name": "a", "description": "d"}));
        let incoming = map(json!({"_key": "k", "description": "d"}));
        assert_eq!(detector().classify(Some(&existing), &incoming), WriteClass::NoOp);
    }

    #[test]
    fn test_new_fields_alone_do_not_count() {
        let existing = doc(json!({"name": "a"}));
        let incoming = map(json!({"name": "a", "extra": 1}));
        assert_eq!(detector().classify(Some(&existing), &incoming), WriteClass::NoOp);
    }

    #[test]
    fn test_system_fields_only_change_is_noop() {
        let existing = doc(json!({
            "_id": "c/k", "_key": "k", "_rev": "_1",
            "_created": "2020-01-01T00:00:00Z", "_modified": "2020-01-01T00:00:00Z",
            "name": "a"
        }));
        let incoming = map(json!({
            "_id": "c/other", "_rev": "_9",
            "_created": "2030-01-01T00:00:00Z", "_modified": "2030-01-01T00:00:00Z",
            "name": "a"
        }));
        assert_eq!(detector().classify(Some(&existing), &incoming), WriteClass::NoOp);
    }

    #[test]
    fn test_deep_structural_equality() {
        let existing = doc(json!({"tags": ["a", "b"], "meta": {"n": 1, "m": [1, {"x": true}]}}));
        let same = map(json!({"meta": {"m": [1, {"x": true}], "n": 1}, "tags": ["a", "b"]}));
        let reordered = map(json!({"tags": ["b", "a"]}));
        let nested = map(json!({"meta": {"n": 1, "m": [1, {"x": false}]}}));

        let d = detector();
        assert_eq!(d.classify(Some(&existing), &same), WriteClass::NoOp);
        assert_eq!(d.classify(Some(&existing), &reordered), WriteClass::Revise);
        assert_eq!(d.classify(Some(&existing), &nested), WriteClass::Revise);
    }

    #[test]
    fn test_exclusion_set_is_configurable() {
        let d = ChangeDetector::new(["_rev", "updated_at"]);
        let existing = doc(json!({"updated_at": 1, "v": 1}));
        let incoming = map(json!({"updated_at": 2, "v": 1}));
        assert_eq!(d.classify(Some(&existing), &incoming), WriteClass::NoOp);
        assert_eq!(d.strip(existing.body()), map(json!({"v": 1})));
    }
}
