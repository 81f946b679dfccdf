use inkvault_core::store::{encrypted_record_key, legacy_active_key, legacy_trash_key};
use inkvault_core::vault::crypto::KdfParams;
use inkvault_core::{
    KeyValueStore, MemoryKeyValueStore, StoreError, StoreResult, VaultError, VaultStore,
};

fn fast_params() -> KdfParams {
    KdfParams { iterations: 1_000 }
}

const LEGACY_ACTIVE: &str = r#"[
    {"id":"a","title":"first","body":"alpha","updatedAt":100},
    {"id":"b","title":"second","body":"beta","updatedAt":200}
]"#;
const LEGACY_TRASH: &str = r#"[
    {"id":"c","title":"gone","body":"gamma","updatedAt":300,"deletedAt":300}
]"#;

#[test]
fn migration_encrypts_legacy_notes_and_deletes_source_keys() {
    let store = MemoryKeyValueStore::new();
    store.put(&legacy_active_key(), LEGACY_ACTIVE).unwrap();
    store.put(&legacy_trash_key(), LEGACY_TRASH).unwrap();

    let mut vault = VaultStore::with_kdf_params(&store, fast_params());
    let outcome = vault.unlock("correct horse").unwrap();

    assert!(outcome.migrated);
    assert_eq!(outcome.payload.active_notes.len(), 2);
    assert_eq!(outcome.payload.trashed_notes.len(), 1);
    assert!(vault.has_encrypted_payload().unwrap());
    assert!(!vault.has_legacy_unencrypted_notes().unwrap());

    // The migrated vault decrypts back to the original collections.
    vault.lock();
    let reopened = vault.unlock("correct horse").unwrap();
    assert!(!reopened.migrated);
    assert_eq!(reopened.payload, outcome.payload);
}

#[test]
fn migration_dedupes_conflicting_ids_last_write_wins() {
    let store = MemoryKeyValueStore::new();
    store
        .put(
            &legacy_active_key(),
            r#"[{"id":"x","title":"old","updatedAt":100}]"#,
        )
        .unwrap();
    store
        .put(
            &legacy_trash_key(),
            r#"[{"id":"x","title":"newer","updatedAt":200,"deletedAt":200}]"#,
        )
        .unwrap();

    let mut vault = VaultStore::with_kdf_params(&store, fast_params());
    let outcome = vault.unlock("pw-for-migration").unwrap();

    assert!(outcome.payload.active_notes.is_empty());
    assert_eq!(outcome.payload.trashed_notes.len(), 1);
    assert_eq!(outcome.payload.trashed_notes[0].title, "newer");
}

#[test]
fn migration_drops_entries_without_ids() {
    let store = MemoryKeyValueStore::new();
    store
        .put(
            &legacy_active_key(),
            r#"[{"id":"ok","title":"kept"},{"title":"no id"},"junk"]"#,
        )
        .unwrap();

    let mut vault = VaultStore::with_kdf_params(&store, fast_params());
    let outcome = vault.unlock("pw-for-migration").unwrap();

    assert_eq!(outcome.payload.active_notes.len(), 1);
    assert_eq!(outcome.payload.active_notes[0].id, "ok");
}

#[test]
fn migrate_without_legacy_data_is_a_noop() {
    let store = MemoryKeyValueStore::new();
    let mut vault = VaultStore::with_kdf_params(&store, fast_params());

    let outcome = vault.migrate_from_legacy("pw").unwrap();
    assert!(!outcome.migrated);
    assert!(!vault.has_encrypted_payload().unwrap());
}

#[test]
fn failed_save_leaves_legacy_keys_untouched() {
    let store = WriteRejectingStore {
        inner: MemoryKeyValueStore::new(),
        reject_key: encrypted_record_key(),
    };
    store.inner.put(&legacy_active_key(), LEGACY_ACTIVE).unwrap();

    let mut vault = VaultStore::with_kdf_params(&store, fast_params());
    let result = vault.migrate_from_legacy("pw-for-migration");

    assert!(matches!(result, Err(VaultError::Storage(_))));
    assert!(store.inner.get(&legacy_active_key()).unwrap().is_some());
}

/// Store that rejects writes to one key, simulating quota exhaustion at the
/// worst possible moment of the migration.
struct WriteRejectingStore {
    inner: MemoryKeyValueStore,
    reject_key: String,
}

impl KeyValueStore for WriteRejectingStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        if key == self.reject_key {
            return Err(StoreError::Unavailable("storage quota exhausted".into()));
        }
        self.inner.put(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.inner.remove(key)
    }

    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.inner.keys_with_prefix(prefix)
    }
}
