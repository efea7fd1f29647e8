//! # Revision Tracking
//!
//! Every write to a tracked entity produces an immutable snapshot. Snapshots
//! are linked into a chain that can be listed and walked in both directions.
//!
//! ## Layout
//!
//! For a tracked collection `docs`:
//!
//! - `docs` holds entity documents, the current state of each record
//! - `docs_history` holds snapshots, one per distinct-content write
//! - `docs_edges` holds the revision graph:
//!   - `revision`: entity -> every snapshot it ever had
//!   - `headRevision`: entity -> current snapshot, exactly one per entity
//!   - `prevRevision`: snapshot -> the snapshot it replaced
//!
//! ## Components
//!
//! - **ChangeDetector**: Create / Revise / NoOp classification
//! - **RevisionWriter**: create and revise sequences, atomic head swap, head repair
//! - **RevisionReader**: list, get, latest, next, previous
//! - **Tracker**: facade with per-entity writer locks and conflict retry

mod config;
mod context;
mod detector;
mod errors;
mod handle;
mod locks;
mod reader;
mod tracker;
mod types;
mod writer;

pub use config::TrackerConfig;
pub use context::{TrackContext, CREATED_FIELD, MODIFIED_FIELD, PARENT_FIELD};
pub use detector::{ChangeDetector, WriteClass};
pub use errors::{TrackError, TrackResult};
pub use handle::{CollectionNames, Handle};
pub use locks::{HandleGuard, HandleLocks};
pub use reader::RevisionReader;
pub use tracker::Tracker;
pub use types::{
    changed, CreatedEntity, ListOptions, RepairReport, RevisedEntity, RevisionDescriptor,
    RevisionKind, SaveOutcome,
};
pub use writer::RevisionWriter;
