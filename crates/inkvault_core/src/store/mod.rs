//! Persistent string-map storage layer.
//!
//! # Responsibility
//! - Define the key-value contract every persisted subsystem writes through.
//! - Own the storage key layout shared by vault, reminders, history and prefs.
//!
//! # Invariants
//! - All persisted state lives under namespaced string keys.
//! - Quota/disk exhaustion surfaces as `StoreError::Unavailable`, never as a
//!   silent write loss.

mod kv;

pub use kv::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreError, StoreResult};

/// Storage namespace prefix shared by every persisted key.
pub const NAMESPACE: &str = "inkvault";

/// Key holding the JSON-encoded encrypted vault record.
pub fn encrypted_record_key() -> String {
    format!("{NAMESPACE}:encrypted_v1")
}

/// Legacy plaintext active-notes key (read-only migration source).
pub fn legacy_active_key() -> String {
    format!("{NAMESPACE}:v1")
}

/// Legacy plaintext trashed-notes key (read-only migration source).
pub fn legacy_trash_key() -> String {
    format!("{NAMESPACE}:trash_v1")
}

/// Key holding the JSON-encoded reminder map.
pub fn reminders_key() -> String {
    format!("{NAMESPACE}:reminders_v1")
}

/// Per-note key holding the JSON-encoded snapshot array.
pub fn history_key(note_id: &str) -> String {
    format!("{NAMESPACE}:history_v1:{note_id}")
}

/// Key prefix shared by all per-note history keys.
pub fn history_key_prefix() -> String {
    format!("{NAMESPACE}:history_v1:")
}

/// Key holding the JSON-encoded preference blob.
pub fn prefs_key() -> String {
    format!("{NAMESPACE}:prefs_v1")
}
