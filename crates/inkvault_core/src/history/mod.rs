//! Per-note version snapshot history.
//!
//! # Responsibility
//! - Persist a bounded, deduplicated list of note revisions per note id.
//!
//! # Invariants
//! - Snapshot lists are newest-first and capped at `max_snapshots`.
//! - Adjacent duplicates (whitespace-insensitive) are never stored twice.
//! - Reads filter malformed entries instead of failing.

pub mod snapshots;

pub use snapshots::{Snapshot, SnapshotStore, DEFAULT_MAX_SNAPSHOTS};
