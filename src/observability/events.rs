//! Observability events for trackdb
//!
//! Every state transition of a tracked entity, and every anomaly in its
//! revision graph, has a named event. Events are explicit and typed.

use std::fmt;

/// Observable events in trackdb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Write classification
    /// Entity and first snapshot written
    EntityCreated,
    /// Snapshot appended and head moved
    RevisionAppended,
    /// Write matched current content; nothing written
    WriteUnchanged,
    /// Entity document removed (history retained)
    EntityDeleted,

    // Head pointer
    /// Head swap lost to a concurrent writer
    HeadConflict,
    /// Conflicting write re-classified and retried
    WriteRetried,
    /// Entity exists without a head edge
    HeadMissing,
    /// More than one head edge observed
    HeadDuplicated,
    /// Duplicate head edges removed
    HeadRepaired,

    // Entity synchronization
    /// Entity document superseded by a newer head before it could be written
    EntitySuperseded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::EntityCreated => "ENTITY_CREATED",
            Event::RevisionAppended => "REVISION_APPENDED",
            Event::WriteUnchanged => "WRITE_UNCHANGED",
            Event::EntityDeleted => "ENTITY_DELETED",

            Event::HeadConflict => "HEAD_CONFLICT",
            Event::WriteRetried => "WRITE_RETRIED",
            Event::HeadMissing => "HEAD_MISSING",
            Event::HeadDuplicated => "HEAD_DUPLICATED",
            Event::HeadRepaired => "HEAD_REPAIRED",

            Event::EntitySuperseded => "ENTITY_SUPERSEDED",
        }
    }

    /// Returns true if the event reports a broken revision graph
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Event::HeadMissing | Event::HeadDuplicated)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::EntityCreated,
            Event::RevisionAppended,
            Event::WriteUnchanged,
            Event::EntityDeleted,
            Event::HeadConflict,
            Event::WriteRetried,
            Event::HeadMissing,
            Event::HeadDuplicated,
            Event::HeadRepaired,
            Event::EntitySuperseded,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_anomaly_events() {
        assert!(Event::HeadMissing.is_anomaly());
        assert!(Event::HeadDuplicated.is_anomaly());
        assert!(!Event::HeadConflict.is_anomaly());
        assert!(!Event::EntityCreated.is_anomaly());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::RevisionAppended), "REVISION_APPENDED");
    }
}
