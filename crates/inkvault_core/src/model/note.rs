//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical note record persisted inside the vault payload.
//! - Provide lifecycle helpers for timestamps and soft-delete semantics.
//!
//! # Invariants
//! - `id` is stable and never reused for another note.
//! - `deleted_at` is the source of truth for trash membership.
//! - `tags` are lowercase, trimmed, deduplicated and sorted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Stable opaque identifier for a note.
///
/// Kept as a plain string rather than a structured id type: legacy stores
/// and imported documents may carry ids this code did not mint, and the only
/// contract is uniqueness within one vault.
pub type NoteId = String;

/// Canonical note record.
///
/// The serde shape matches the persisted/export JSON (camelCase keys).
/// Fields other than `id` default permissively so older records parse;
/// a record without an `id` is rejected by serde.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Stable opaque ID used for linking, reminders and history keys.
    pub id: NoteId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Creation time in epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
    /// Last mutation time in epoch milliseconds.
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub pinned: bool,
    /// Normalized lowercase tags, sorted and deduplicated.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Soft-delete tombstone; `Some` means the note lives in trash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
    /// Pending reminder time mirrored from the reminder store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_at: Option<i64>,
}

impl Note {
    /// Creates a new note with a generated stable ID and fresh timestamps.
    pub fn new(title: impl Into<String>, body: impl Into<String>, now: i64) -> Self {
        Self {
            id: fresh_note_id(),
            title: title.into(),
            body: body.into(),
            created_at: now,
            updated_at: now,
            pinned: false,
            tags: Vec::new(),
            deleted_at: None,
            reminder_at: None,
        }
    }

    /// Stamps the last-mutation timestamp.
    pub fn touch(&mut self, now: i64) {
        self.updated_at = now;
    }

    /// Marks this note as trashed.
    pub fn soft_delete(&mut self, now: i64) {
        self.deleted_at = Some(now);
        self.touch(now);
    }

    /// Clears the trash tombstone.
    pub fn restore(&mut self, now: i64) {
        self.deleted_at = None;
        self.touch(now);
    }

    /// Returns whether this note lives in the trashed collection.
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Replaces the full tag set with normalized values.
    pub fn set_tags(&mut self, tags: &[String], now: i64) {
        self.tags = normalize_tags(tags);
        self.touch(now);
    }
}

/// Mints a fresh opaque note ID.
pub fn fresh_note_id() -> NoteId {
    Uuid::new_v4().to_string()
}

/// Normalizes one tag value; empty input maps to `None`.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates tag values, sorted ascending.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::{normalize_tags, Note};

    #[test]
    fn new_note_starts_active_with_matching_timestamps() {
        let note = Note::new("title", "body", 1_000);
        assert!(!note.is_trashed());
        assert_eq!(note.created_at, 1_000);
        assert_eq!(note.updated_at, 1_000);
        assert!(!note.id.is_empty());
    }

    #[test]
    fn soft_delete_and_restore_flip_tombstone_and_touch() {
        let mut note = Note::new("t", "b", 1_000);
        note.soft_delete(2_000);
        assert!(note.is_trashed());
        assert_eq!(note.updated_at, 2_000);

        note.restore(3_000);
        assert!(!note.is_trashed());
        assert_eq!(note.updated_at, 3_000);
    }

    #[test]
    fn set_tags_normalizes_lowercase_sorted_unique() {
        let mut note = Note::new("t", "b", 1_000);
        note.set_tags(
            &[
                "Work".to_string(),
                "IMPORTANT".to_string(),
                " work ".to_string(),
                "".to_string(),
            ],
            2_000,
        );
        assert_eq!(note.tags, vec!["important".to_string(), "work".to_string()]);
    }

    #[test]
    fn normalize_tags_drops_blank_values() {
        let tags = normalize_tags(&["  ".to_string(), "A".to_string()]);
        assert_eq!(tags, vec!["a".to_string()]);
    }

    #[test]
    fn note_parses_with_missing_optional_fields() {
        let note: Note = serde_json::from_str(r#"{"id":"n1","title":"Hi"}"#).unwrap();
        assert_eq!(note.id, "n1");
        assert_eq!(note.body, "");
        assert!(!note.pinned);
        assert!(note.tags.is_empty());
        assert_eq!(note.deleted_at, None);
    }

    #[test]
    fn note_without_id_is_rejected() {
        let parsed = serde_json::from_str::<Note>(r#"{"title":"Hi"}"#);
        assert!(parsed.is_err());
    }
}
