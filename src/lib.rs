//! trackdb - Revision-tracked documents over a document and graph store
//!
//! Every write to an entity is kept as an immutable snapshot, linked into a
//! chain that can be listed and walked forward and backward.

pub mod cli;
pub mod observability;
pub mod store;
pub mod tracking;
