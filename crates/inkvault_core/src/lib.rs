//! Core domain logic for inkvault.
//! This crate is the single source of truth for vault and scheduling
//! invariants; UI layers call in through the service facade only.

pub mod db;
pub mod history;
pub mod logging;
pub mod model;
pub mod prefs;
pub mod reminder;
pub mod service;
pub mod store;
pub mod transfer;
pub mod vault;

pub use history::{Snapshot, SnapshotStore, DEFAULT_MAX_SNAPSHOTS};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{fresh_note_id, normalize_tag, normalize_tags, Note, NoteId};
pub use prefs::{PreferenceStore, Preferences, SortOrder, Theme};
pub use reminder::{
    Clock, NotificationPermission, NotificationSink, Reminder, ReminderError, ReminderScheduler,
    SystemClock,
};
pub use service::{Workspace, WorkspaceError};
pub use store::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreError, StoreResult};
pub use transfer::{ExportDocument, ImportedNotes, TransferError};
pub use vault::{
    EncryptedRecord, MigrationOutcome, UnlockOutcome, VaultError, VaultPayload, VaultResult,
    VaultState, VaultStore,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
