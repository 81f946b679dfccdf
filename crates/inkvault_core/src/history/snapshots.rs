//! Snapshot store implementation.
//!
//! # Responsibility
//! - Record note revisions at save boundaries, bounded per note.
//! - Serve restore/list/delete operations over persisted history.
//!
//! # Invariants
//! - Dedup compares against the immediate predecessor only, not the whole
//!   history.
//! - `clear_snapshots`/`delete_snapshot` are idempotent.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::note::Note;
use crate::model::now_epoch_ms;
use crate::store::{history_key, KeyValueStore};

/// Default bound on stored snapshots per note.
pub const DEFAULT_MAX_SNAPSHOTS: usize = 25;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// One stored note revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub created_at: i64,
    pub title: String,
    pub body: String,
}

/// Store of bounded per-note revision history.
pub struct SnapshotStore<S: KeyValueStore> {
    store: S,
    max_snapshots: usize,
}

impl<S: KeyValueStore> SnapshotStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_capacity(store, DEFAULT_MAX_SNAPSHOTS)
    }

    pub fn with_capacity(store: S, max_snapshots: usize) -> Self {
        Self {
            store,
            max_snapshots,
        }
    }

    /// Records a revision of `note` unless it matches the newest stored one.
    ///
    /// Returns the stored snapshot, or `None` when deduplicated away.
    pub fn add_snapshot(&self, note: &Note) -> Option<Snapshot> {
        let mut snapshots = self.list_snapshots(&note.id);

        if let Some(newest) = snapshots.first() {
            if normalized(&newest.title) == normalized(&note.title)
                && normalized(&newest.body) == normalized(&note.body)
            {
                return None;
            }
        }

        let snapshot = Snapshot {
            id: Uuid::new_v4().to_string(),
            created_at: now_epoch_ms(),
            title: note.title.clone(),
            body: note.body.clone(),
        };

        snapshots.insert(0, snapshot.clone());
        snapshots.truncate(self.max_snapshots);
        self.persist(&note.id, &snapshots);

        Some(snapshot)
    }

    /// Returns all snapshots for `note_id`, newest first.
    ///
    /// Malformed persisted entries are filtered out, never a read failure.
    pub fn list_snapshots(&self, note_id: &str) -> Vec<Snapshot> {
        let raw = match self.store.get(&history_key(note_id)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!("event=history_load module=history status=error error={err}");
                return Vec::new();
            }
        };

        let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(err) => {
                warn!("event=history_load module=history status=error error={err}");
                return Vec::new();
            }
        };

        values
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect()
    }

    /// Removes all history for `note_id`. Idempotent.
    pub fn clear_snapshots(&self, note_id: &str) {
        if let Err(err) = self.store.remove(&history_key(note_id)) {
            warn!("event=history_persist module=history status=error error={err}");
        }
    }

    /// Removes one snapshot by id. No-op when either target is absent.
    pub fn delete_snapshot(&self, note_id: &str, snapshot_id: &str) {
        let snapshots = self.list_snapshots(note_id);
        let remaining: Vec<Snapshot> = snapshots
            .into_iter()
            .filter(|snapshot| snapshot.id != snapshot_id)
            .collect();

        if remaining.is_empty() {
            self.clear_snapshots(note_id);
        } else {
            self.persist(note_id, &remaining);
        }
    }

    fn persist(&self, note_id: &str, snapshots: &[Snapshot]) {
        let raw = match serde_json::to_string(snapshots) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("event=history_persist module=history status=error error={err}");
                return;
            }
        };
        if let Err(err) = self.store.put(&history_key(note_id), &raw) {
            warn!("event=history_persist module=history status=error error={err}");
        }
    }
}

fn normalized(value: &str) -> String {
    WHITESPACE_RE.replace_all(value, " ").trim().to_string()
}
