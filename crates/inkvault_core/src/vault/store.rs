//! Encrypted vault store and its state machine.
//!
//! # Responsibility
//! - Own unlock/save/lock over the single persisted encrypted record.
//! - Perform the one-shot migration from legacy plaintext keys.
//!
//! # Invariants
//! - Every save regenerates salt and nonce and overwrites the whole record.
//! - Legacy keys are removed only after the encrypted save succeeded.
//! - Wrong passphrase and corrupted record are indistinguishable to callers.

use log::{info, warn};
use std::time::Instant;

use crate::model::now_epoch_ms;
use crate::store::{
    encrypted_record_key, legacy_active_key, legacy_trash_key, KeyValueStore,
};
use crate::vault::crypto::{
    derive_key, generate_nonce, generate_salt, open, seal, DerivedKey, KdfParams,
    MIN_KDF_ITERATIONS,
};
use crate::vault::payload::parse_legacy_notes;
use crate::vault::record::EncryptedRecord;
use crate::vault::{VaultError, VaultPayload, VaultResult};

/// Persisted-plus-session state of the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// Nothing persisted: no record, no legacy data.
    NoVault,
    /// Unencrypted legacy keys exist and no encrypted record does.
    LegacyPresent,
    /// Encrypted record exists; no key has been derived this session.
    Locked,
    /// Key held in memory; a working copy is live with the caller.
    Unlocked,
}

/// Result of a successful unlock.
#[derive(Debug)]
pub struct UnlockOutcome {
    /// True when this unlock performed the legacy migration.
    pub migrated: bool,
    pub payload: VaultPayload,
}

/// Result of a legacy migration attempt.
#[derive(Debug)]
pub struct MigrationOutcome {
    /// False when no legacy data existed to migrate.
    pub migrated: bool,
    pub payload: VaultPayload,
}

struct Session {
    /// Derived key for the unlock that opened this session, held only so it
    /// zeroizes when the session drops. `None` for a fresh vault where
    /// nothing has been encrypted yet.
    _key: Option<DerivedKey>,
}

/// Owner of the persisted encrypted record.
pub struct VaultStore<S: KeyValueStore> {
    store: S,
    kdf_params: KdfParams,
    session: Option<Session>,
    /// `updated_at` of the record as last read or written by this instance;
    /// used to detect foreign overwrites between our writes.
    last_seen_write: Option<i64>,
}

impl<S: KeyValueStore> VaultStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            kdf_params: KdfParams::default(),
            session: None,
            last_seen_write: None,
        }
    }

    /// Overrides KDF tuning. Intended for tests; production callers keep the
    /// default iteration count.
    pub fn with_kdf_params(store: S, kdf_params: KdfParams) -> Self {
        Self {
            store,
            kdf_params,
            session: None,
            last_seen_write: None,
        }
    }

    /// Classifies persisted state only, ignoring any live session.
    pub fn detect_vault_state(&self) -> VaultResult<VaultState> {
        if self.has_encrypted_payload()? {
            return Ok(VaultState::Locked);
        }
        if self.has_legacy_unencrypted_notes()? {
            return Ok(VaultState::LegacyPresent);
        }
        Ok(VaultState::NoVault)
    }

    /// Current state including the in-memory session.
    pub fn state(&self) -> VaultResult<VaultState> {
        if self.session.is_some() {
            return Ok(VaultState::Unlocked);
        }
        self.detect_vault_state()
    }

    pub fn has_encrypted_payload(&self) -> VaultResult<bool> {
        Ok(self.store.get(&encrypted_record_key())?.is_some())
    }

    pub fn has_legacy_unencrypted_notes(&self) -> VaultResult<bool> {
        Ok(self.store.get(&legacy_active_key())?.is_some()
            || self.store.get(&legacy_trash_key())?.is_some())
    }

    /// Unlocks the vault with `passphrase`.
    ///
    /// - `Locked`: decrypts and validates the persisted record.
    /// - `LegacyPresent`: performs the one-shot migration instead.
    /// - `NoVault`: opens an empty working copy; nothing is persisted until
    ///   the first save.
    pub fn unlock(&mut self, passphrase: &str) -> VaultResult<UnlockOutcome> {
        let started_at = Instant::now();
        info!("event=vault_unlock module=vault status=start");

        let outcome = match self.detect_vault_state()? {
            VaultState::NoVault => {
                self.session = Some(Session { _key: None });
                Ok(UnlockOutcome {
                    migrated: false,
                    payload: VaultPayload::empty(),
                })
            }
            VaultState::LegacyPresent => {
                let migration = self.migrate_from_legacy(passphrase)?;
                Ok(UnlockOutcome {
                    migrated: migration.migrated,
                    payload: migration.payload,
                })
            }
            VaultState::Locked | VaultState::Unlocked => self.unlock_from_record(passphrase),
        };

        match &outcome {
            Ok(unlocked) => info!(
                "event=vault_unlock module=vault status=ok duration_ms={} migrated={} active={} trashed={}",
                started_at.elapsed().as_millis(),
                unlocked.migrated,
                unlocked.payload.active_notes.len(),
                unlocked.payload.trashed_notes.len()
            ),
            Err(err) => warn!(
                "event=vault_unlock module=vault status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }

        outcome
    }

    fn unlock_from_record(&mut self, passphrase: &str) -> VaultResult<UnlockOutcome> {
        let raw = self
            .store
            .get(&encrypted_record_key())?
            .ok_or_else(|| VaultError::MalformedPayload("encrypted record missing".to_string()))?;

        let record = EncryptedRecord::parse(&raw)?;
        // Accept records no weaker than our configured strength, capped at
        // the compatibility floor; test tunings stay self-consistent.
        record.validate(self.kdf_params.iterations.min(MIN_KDF_ITERATIONS))?;

        let salt = record.salt_bytes()?;
        let nonce = record.nonce_bytes()?;
        let ciphertext = record.data_bytes()?;

        // The record's stored count wins over our default so older/newer
        // vaults stay readable across iteration bumps.
        let params = KdfParams {
            iterations: record.kdf.iterations,
        };
        let key = derive_key(passphrase, &salt, &params);
        let plaintext = open(&key, &nonce, &ciphertext)?;
        let payload = VaultPayload::from_bytes(&plaintext)?;

        self.session = Some(Session { _key: Some(key) });
        self.last_seen_write = Some(record.updated_at);

        Ok(UnlockOutcome {
            migrated: false,
            payload,
        })
    }

    /// Serializes, encrypts and persists `payload`, fully replacing the
    /// prior record. Salt and nonce are freshly random on every call.
    pub fn save(&mut self, passphrase: &str, payload: &VaultPayload) -> VaultResult<()> {
        let started_at = Instant::now();

        self.warn_on_foreign_overwrite()?;

        let plaintext = payload.to_bytes()?;
        let salt = generate_salt();
        let nonce = generate_nonce();
        let key = derive_key(passphrase, &salt, &self.kdf_params);
        let ciphertext = seal(&key, &nonce, &plaintext)?;

        let now = now_epoch_ms();
        let record = EncryptedRecord::compose(&salt, &nonce, &ciphertext, &self.kdf_params, now);
        self.store.put(&encrypted_record_key(), &record.to_json()?)?;

        self.session = Some(Session { _key: Some(key) });
        self.last_seen_write = Some(now);

        info!(
            "event=vault_save module=vault status=ok duration_ms={} active={} trashed={}",
            started_at.elapsed().as_millis(),
            payload.active_notes.len(),
            payload.trashed_notes.len()
        );
        Ok(())
    }

    /// One-shot migration of legacy plaintext keys into the encrypted
    /// record. The legacy keys are deleted only after the save succeeded.
    pub fn migrate_from_legacy(&mut self, passphrase: &str) -> VaultResult<MigrationOutcome> {
        let legacy_active = self.store.get(&legacy_active_key())?;
        let legacy_trash = self.store.get(&legacy_trash_key())?;

        if legacy_active.is_none() && legacy_trash.is_none() {
            return Ok(MigrationOutcome {
                migrated: false,
                payload: VaultPayload::empty(),
            });
        }

        let active = legacy_active
            .as_deref()
            .map(parse_legacy_notes)
            .unwrap_or_default();
        let trashed = legacy_trash
            .as_deref()
            .map(parse_legacy_notes)
            .unwrap_or_default();

        let mut payload = VaultPayload::new(active, trashed);
        payload.dedupe_last_write_wins();

        self.save(passphrase, &payload)?;

        self.store.remove(&legacy_active_key())?;
        self.store.remove(&legacy_trash_key())?;

        info!(
            "event=vault_migrate module=vault status=ok active={} trashed={}",
            payload.active_notes.len(),
            payload.trashed_notes.len()
        );

        Ok(MigrationOutcome {
            migrated: true,
            payload,
        })
    }

    /// Discards the held key. In-memory only; the persisted record is
    /// untouched. Callers with unsaved changes must save first, since the
    /// plaintext is unrecoverable until the next unlock.
    pub fn lock(&mut self) {
        self.session = None;
        info!("event=vault_lock module=vault status=ok");
    }

    fn warn_on_foreign_overwrite(&self) -> VaultResult<()> {
        let Some(expected) = self.last_seen_write else {
            return Ok(());
        };
        if let Some(raw) = self.store.get(&encrypted_record_key())? {
            if let Ok(record) = EncryptedRecord::parse(&raw) {
                if record.updated_at != expected {
                    warn!(
                        "event=vault_save_conflict module=vault status=warn expected={} found={}",
                        expected, record.updated_at
                    );
                }
            }
        }
        Ok(())
    }
}
