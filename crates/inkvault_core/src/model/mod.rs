//! Canonical domain model for the note corpus.
//!
//! # Responsibility
//! - Define the note record shared by vault, reminder and history subsystems.
//! - Keep a single wire shape compatible with legacy and exported JSON.
//!
//! # Invariants
//! - Every note is identified by a stable opaque `NoteId`.
//! - Trash membership is represented by the `deleted_at` tombstone, not by
//!   destructive removal.

pub mod note;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
